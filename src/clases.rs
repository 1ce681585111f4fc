use axum::extract::Path;
use axum::{Extension, Json};
use chrono::Utc;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::err::Error;
use crate::models::{AlumnoAsistencia, Clase, ListaAlumnos};
use crate::{creates, proceeds, Created, Payload};

const ALFABETO_ID_CLASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LARGO_ID_CLASE: usize = 6;

/// Creates a class session for a subject: resolves the subject name, takes
/// the next sequence number, mints a short opaque id and inserts the row.
/// The insert is the only mutating statement, so a failure anywhere leaves
/// no partial session behind.
pub async fn crear_clase(
    Json(body): Json<CrearClase>,
    Extension(pool): Extension<MySqlPool>,
) -> Created<ClaseCreada> {
    let id_materia = match body.id_materia {
        Some(id_materia) => id_materia,
        None => {
            return Err(Error::validation(
                "Por favor, proporciona el id de la materia",
            ))
        }
    };

    let nombre_materia = sqlx::query_scalar::<_, String>("SELECT nombre FROM materias WHERE id = ?")
        .bind(id_materia)
        .fetch_optional(&pool)
        .await
        .map_err(Error::from)?
        .ok_or_else(|| Error::not_found("Materia no encontrada"))?;

    // Next number = existing sessions + 1. Class rows are never deleted, so
    // the sequence is monotonic under sequential creation; two concurrent
    // creations for the same subject can still draw the same number.
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clases WHERE id_materia = ?")
        .bind(id_materia)
        .fetch_one(&pool)
        .await
        .map_err(Error::from)?;

    let id_clase = genera_id_clase();
    let nombre_clase = nombre_de_clase(&nombre_materia, total + 1);

    sqlx::query(
        "INSERT INTO clases (id_clase, id_materia, nombre, fecha_creacion) VALUES (?, ?, ?, ?)",
    )
    .bind(&id_clase)
    .bind(id_materia)
    .bind(&nombre_clase)
    .bind(Utc::now().naive_utc())
    .execute(&pool)
    .await
    .map_err(Error::from)?;

    creates(ClaseCreada {
        message: "Clase creada exitosamente".to_string(),
        id_clase,
        nombre_clase,
    })
}

pub async fn clases_de_materia(
    Path(materia_id): Path<i32>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Vec<Clase>> {
    let clases = sqlx::query_as::<_, Clase>(
        "SELECT id_materia, id_clase, nombre, fecha_creacion FROM clases WHERE id_materia = ?",
    )
    .bind(materia_id)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    proceeds(clases)
}

pub async fn alumnos_de_clase(
    Path(id_clase): Path<String>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<ListaAlumnos<AlumnoAsistencia>> {
    let alumnos = sqlx::query_as::<_, AlumnoAsistencia>(
        "SELECT u.id, u.nombre, u.correo, a.id_tp_asistencia \
         FROM asistencia a \
         JOIN usuario u ON a.id_usuario = u.id \
         WHERE a.id_clase = ?",
    )
    .bind(&id_clase)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    proceeds(ListaAlumnos { alumnos })
}

// 36^6 ids, drawn without a uniqueness check; a collision surfaces as a
// primary-key violation on insert.
fn genera_id_clase() -> String {
    let mut rng = thread_rng();
    (0..LARGO_ID_CLASE)
        .map(|_| ALFABETO_ID_CLASE[rng.gen_range(0..ALFABETO_ID_CLASE.len())] as char)
        .collect()
}

fn nombre_de_clase(materia: &str, numero: i64) -> String {
    format!("{} clase {}", materia, numero)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrearClase {
    #[serde(rename = "idMateria")]
    pub id_materia: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaseCreada {
    pub message: String,
    #[serde(rename = "idClase")]
    pub id_clase: String,
    #[serde(rename = "nombreClase")]
    pub nombre_clase: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_clase_has_fixed_length_and_alphabet() {
        for _ in 0..50 {
            let id = genera_id_clase();
            assert_eq!(id.len(), LARGO_ID_CLASE);
            assert!(id.bytes().all(|b| ALFABETO_ID_CLASE.contains(&b)));
        }
    }

    #[test]
    fn class_labels_follow_the_subject_sequence() {
        assert_eq!(nombre_de_clase("Cálculo", 1), "Cálculo clase 1");
        assert_eq!(nombre_de_clase("Cálculo", 12), "Cálculo clase 12");

        let etiquetas: Vec<String> = (1..=4).map(|n| nombre_de_clase("Física", n)).collect();
        for par in etiquetas.windows(2) {
            assert_ne!(par[0], par[1]);
        }
    }

    #[test]
    fn created_class_uses_camel_case_keys() {
        let body = serde_json::to_value(ClaseCreada {
            message: "Clase creada exitosamente".to_string(),
            id_clase: "A1B2C3".to_string(),
            nombre_clase: "Cálculo clase 1".to_string(),
        })
        .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({
                "message": "Clase creada exitosamente",
                "idClase": "A1B2C3",
                "nombreClase": "Cálculo clase 1",
            })
        );
    }
}
