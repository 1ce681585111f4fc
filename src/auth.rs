use axum::{Extension, Json};
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::err::Error;
use crate::models::{Mensaje, TP_USUARIO_DEFECTO};
use crate::{creates, proceeds, Created, Payload};

pub async fn login(
    Json(body): Json<Login>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<ResultadoLogin> {
    let (correo, password) = match (body.correo, body.password) {
        (Some(correo), Some(password)) if !correo.is_empty() && !password.is_empty() => {
            (correo, password)
        }
        _ => {
            return Err(Error::validation(
                "Por favor, proporciona correo y contraseña",
            ))
        }
    };

    let usuario = sqlx::query_as::<_, Credenciales>(
        "SELECT id, nombre, id_tp_usuario, contrasena FROM usuario WHERE correo = ?",
    )
    .bind(&correo)
    .fetch_optional(&pool)
    .await
    .map_err(Error::from)?;

    // Unknown correo and wrong password answer identically.
    let usuario = match usuario {
        Some(usuario) => usuario,
        None => return proceeds(ResultadoLogin::invalido()),
    };

    if verify_password(&password, &usuario.contrasena)? {
        proceeds(ResultadoLogin::Valido {
            valid: true,
            id: usuario.id,
            nombre: usuario.nombre,
            id_tp_usuario: usuario.id_tp_usuario,
        })
    } else {
        proceeds(ResultadoLogin::invalido())
    }
}

pub async fn registro(
    Json(body): Json<Registro>,
    Extension(pool): Extension<MySqlPool>,
) -> Created<Mensaje> {
    let (nombre, correo, contrasena) = match (body.nombre, body.correo, body.contrasena) {
        (Some(nombre), Some(correo), Some(contrasena))
            if !nombre.is_empty() && !correo.is_empty() && !contrasena.is_empty() =>
        {
            (nombre, correo, contrasena)
        }
        _ => return Err(Error::validation("Todos los campos son requeridos.")),
    };

    let contrasena = hash_password(&contrasena)?;

    // The UNIQUE constraint on correo rejects duplicates; the product
    // reports every insert failure as an already-registered correo.
    sqlx::query(
        "INSERT INTO usuario (correo, nombre, contrasena, id_tp_usuario) VALUES (?, ?, ?, ?)",
    )
    .bind(&correo)
    .bind(&nombre)
    .bind(&contrasena)
    .bind(TP_USUARIO_DEFECTO)
    .execute(&pool)
    .await
    .map_err(|err| {
        log::error!("user insert failed: {}", err);
        Error::conflict("Correo ya registrado, recupera tu contraseña")
    })?;

    creates(Mensaje::new("Usuario fue registrado con éxito."))
}

pub async fn validar_correo(
    Json(body): Json<ValidarCorreo>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Existe> {
    let correo = match body.correo {
        Some(correo) if !correo.is_empty() => correo,
        _ => return Err(Error::validation("Por favor, proporciona un correo")),
    };

    let existe = sqlx::query_scalar::<_, i64>("SELECT 1 FROM usuario WHERE correo = ?")
        .bind(&correo)
        .fetch_optional(&pool)
        .await
        .map_err(Error::from)?
        .is_some();

    proceeds(Existe { existe })
}

pub async fn cambiar_contrasena(
    Json(body): Json<CambiarContrasena>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Mensaje> {
    let (correo, nueva) = match (body.correo, body.nueva_contrasena) {
        (Some(correo), Some(nueva)) if !correo.is_empty() && !nueva.is_empty() => (correo, nueva),
        _ => {
            return Err(Error::validation(
                "Por favor, proporciona el correo y la nueva contraseña",
            ))
        }
    };

    let contrasena = hash_password(&nueva)?;

    let res = sqlx::query("UPDATE usuario SET contrasena = ? WHERE correo = ?")
        .bind(&contrasena)
        .bind(&correo)
        .execute(&pool)
        .await
        .map_err(Error::from)?;

    if res.rows_affected() > 0 {
        proceeds(Mensaje::new("Contraseña cambiada exitosamente"))
    } else {
        Err(Error::not_found("Correo no registrado"))
    }
}

pub(crate) fn hash_password(password: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Pbkdf2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub(crate) fn verify_password(password: &str, almacenada: &str) -> Result<bool, Error> {
    let hash = PasswordHash::new(almacenada)?;
    Ok(Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok())
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct Credenciales {
    id: i32,
    nombre: String,
    id_tp_usuario: i32,
    contrasena: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResultadoLogin {
    Valido {
        valid: bool,
        id: i32,
        nombre: String,
        id_tp_usuario: i32,
    },
    Invalido {
        valid: bool,
    },
}

impl ResultadoLogin {
    fn invalido() -> Self {
        ResultadoLogin::Invalido { valid: false }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub correo: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registro {
    pub nombre: Option<String>,
    pub correo: Option<String>,
    pub contrasena: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidarCorreo {
    pub correo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CambiarContrasena {
    pub correo: Option<String>,
    #[serde(rename = "nuevaContrasena")]
    pub nueva_contrasena: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Existe {
    pub existe: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hash = hash_password("secreta123").expect("hash");
        assert!(verify_password("secreta123", &hash).expect("verify"));
        assert!(!verify_password("otra-cosa", &hash).expect("verify"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("secreta123").expect("hash");
        let b = hash_password("secreta123").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_stored_hash_is_an_error() {
        assert!(verify_password("secreta123", "no-es-un-hash-phc").is_err());
    }

    #[test]
    fn absent_fields_deserialize_to_none() {
        let body: Login = serde_json::from_str(r#"{"correo": "a@b.mx"}"#).expect("deserialize");
        assert_eq!(body.correo.as_deref(), Some("a@b.mx"));
        assert!(body.password.is_none());

        let body: CambiarContrasena =
            serde_json::from_str(r#"{"correo": "a@b.mx", "nuevaContrasena": "x"}"#)
                .expect("deserialize");
        assert_eq!(body.nueva_contrasena.as_deref(), Some("x"));
    }

    #[test]
    fn invalid_login_carries_only_the_valid_flag() {
        let body = serde_json::to_value(ResultadoLogin::invalido()).expect("serialize");
        assert_eq!(body, serde_json::json!({ "valid": false }));
    }

    #[test]
    fn valid_login_exposes_identity_fields() {
        let body = serde_json::to_value(ResultadoLogin::Valido {
            valid: true,
            id: 7,
            nombre: "Ana".to_string(),
            id_tp_usuario: 1,
        })
        .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "valid": true,
                "id": 7,
                "nombre": "Ana",
                "id_tp_usuario": 1,
            })
        );
    }
}
