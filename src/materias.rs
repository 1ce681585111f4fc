use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::err::Error;
use crate::models::{Alumno, ListaAlumnos, Materia, MateriaInscrita, Mensaje};
use crate::{creates, proceeds, Created, Payload};

pub async fn listar_materias(Extension(pool): Extension<MySqlPool>) -> Payload<Vec<Materia>> {
    let materias = sqlx::query_as::<_, Materia>("SELECT id, nombre, descripcion FROM materias")
        .fetch_all(&pool)
        .await
        .map_err(Error::from)?;

    proceeds(materias)
}

pub async fn materias_de_usuario(
    Path(usuario_id): Path<i32>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Vec<MateriaInscrita>> {
    let materias = sqlx::query_as::<_, MateriaInscrita>(
        "SELECT um.materia_id, m.nombre, m.descripcion \
         FROM usuario_materia um \
         INNER JOIN materias m ON um.materia_id = m.id \
         WHERE um.usuario_id = ?",
    )
    .bind(usuario_id)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    proceeds(materias)
}

pub async fn alumnos_de_materia(
    Path(id_materia): Path<i32>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<ListaAlumnos<Alumno>> {
    let alumnos = sqlx::query_as::<_, Alumno>(
        "SELECT u.id, u.nombre, u.correo \
         FROM usuario_materia um \
         JOIN usuario u ON um.usuario_id = u.id \
         WHERE um.materia_id = ?",
    )
    .bind(id_materia)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    proceeds(ListaAlumnos { alumnos })
}

/// Enrolls the user into every given subject. Assignment is idempotent:
/// pairs that already exist are skipped, the rest insert inside one
/// transaction that commits only after all of them were attempted.
pub async fn asignar_materias(
    Json(body): Json<AsignarMaterias>,
    Extension(pool): Extension<MySqlPool>,
) -> Created<Mensaje> {
    let (usuario_id, materias) = match (body.usuario_id, body.materias) {
        (Some(usuario_id), Some(materias)) if !materias.is_empty() => (usuario_id, materias),
        _ => {
            return Err(Error::validation(
                "Por favor, proporciona usuarioId y materias",
            ))
        }
    };

    let mut tx = pool.begin().await.map_err(Error::from)?;

    for &materia_id in &materias {
        let ya_asignada = sqlx::query_scalar::<_, i64>(
            "SELECT 1 FROM usuario_materia WHERE usuario_id = ? AND materia_id = ?",
        )
        .bind(usuario_id)
        .bind(materia_id)
        .fetch_optional(&mut tx)
        .await
        .map_err(Error::from)?
        .is_some();

        if ya_asignada {
            continue;
        }

        sqlx::query("INSERT INTO usuario_materia (usuario_id, materia_id) VALUES (?, ?)")
            .bind(usuario_id)
            .bind(materia_id)
            .execute(&mut tx)
            .await
            .map_err(Error::from)?;
    }

    tx.commit().await.map_err(Error::from)?;

    creates(Mensaje::new("Materias asignadas correctamente"))
}

/// Drops every enrollment of the user matching the given subjects, in a
/// single statement.
pub async fn remover_materias(
    Json(body): Json<RemoverMaterias>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Mensaje> {
    let (usuario_id, materias) = match (body.usuario_id, body.materias_ids) {
        (Some(usuario_id), Some(materias)) if !materias.is_empty() => (usuario_id, materias),
        _ => {
            return Err(Error::validation(
                "Por favor, proporciona usuarioId y materiasIds",
            ))
        }
    };

    let mut consulta =
        QueryBuilder::<MySql>::new("DELETE FROM usuario_materia WHERE usuario_id = ");
    consulta.push_bind(usuario_id);
    consulta.push(" AND materia_id IN (");
    let mut ids = consulta.separated(", ");
    for materia_id in materias {
        ids.push_bind(materia_id);
    }
    ids.push_unseparated(")");

    consulta
        .build()
        .execute(&pool)
        .await
        .map_err(Error::from)?;

    proceeds(Mensaje::new("Materias removidas correctamente"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AsignarMaterias {
    #[serde(rename = "usuarioId")]
    pub usuario_id: Option<i32>,
    pub materias: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoverMaterias {
    #[serde(rename = "usuarioId")]
    pub usuario_id: Option<i32>,
    #[serde(rename = "materiasIds")]
    pub materias_ids: Option<Vec<i32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_payload_keys_map_to_fields() {
        let body: AsignarMaterias =
            serde_json::from_str(r#"{"usuarioId": 3, "materias": [1, 2, 5]}"#)
                .expect("deserialize");
        assert_eq!(body.usuario_id, Some(3));
        assert_eq!(body.materias, Some(vec![1, 2, 5]));

        let body: RemoverMaterias =
            serde_json::from_str(r#"{"usuarioId": 3, "materiasIds": [2]}"#).expect("deserialize");
        assert_eq!(body.materias_ids, Some(vec![2]));
    }

    #[test]
    fn absent_ids_deserialize_to_none() {
        let body: AsignarMaterias = serde_json::from_str(r#"{"materias": [1]}"#)
            .expect("deserialize");
        assert!(body.usuario_id.is_none());
    }
}
