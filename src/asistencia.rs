use axum::extract::{Path, Query};
use axum::{Extension, Json};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool, QueryBuilder};

use crate::err::Error;
use crate::models::{Mensaje, TP_ASISTENCIA_PENDIENTE, TP_ASISTENCIA_PRESENTE};
use crate::{creates, proceeds, Created, Payload};

/// Seeds the attendance of a class from the subject roster: one query to
/// resolve the enrolled users, one multi-row insert marking all of them
/// pending. Running it twice for the same class duplicates the rows; the
/// canonical flow runs it once right after crear-clase.
pub async fn registrar_asistencia(
    Json(body): Json<RegistrarAsistencia>,
    Extension(pool): Extension<MySqlPool>,
) -> Created<AsistenciaRegistrada> {
    let (id_clase, id_materia) = match (body.id_clase, body.id_materia) {
        (Some(id_clase), Some(id_materia)) if !id_clase.is_empty() => (id_clase, id_materia),
        _ => {
            return Err(Error::validation(
                "Por favor, proporciona idClase e idMateria",
            ))
        }
    };

    let clase_existe = sqlx::query_scalar::<_, i64>("SELECT 1 FROM clases WHERE id_clase = ?")
        .bind(&id_clase)
        .fetch_optional(&pool)
        .await
        .map_err(Error::from)?
        .is_some();

    if !clase_existe {
        return Err(Error::not_found("Clase no encontrada"));
    }

    let inscritos = sqlx::query_as::<_, Inscrito>(
        "SELECT u.id, u.nombre \
         FROM usuario_materia um \
         JOIN usuario u ON um.usuario_id = u.id \
         WHERE um.materia_id = ?",
    )
    .bind(id_materia)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    if inscritos.is_empty() {
        return Err(Error::not_found("No hay alumnos inscritos en la materia"));
    }

    let mut consulta = QueryBuilder::<MySql>::new(
        "INSERT INTO asistencia (id_clase, id_materia, id_usuario, id_tp_asistencia, nombre) ",
    );
    consulta.push_values(&inscritos, |mut fila, inscrito| {
        fila.push_bind(&id_clase)
            .push_bind(id_materia)
            .push_bind(inscrito.id)
            .push_bind(TP_ASISTENCIA_PENDIENTE)
            .push_bind(&inscrito.nombre);
    });

    let res = consulta
        .build()
        .execute(&pool)
        .await
        .map_err(Error::from)?;

    creates(AsistenciaRegistrada {
        message: "Asistencia registrada exitosamente".to_string(),
        total_asistencias: res.rows_affected(),
    })
}

/// Transitions the single matching record to presente. Targeted update, not
/// an upsert: without a seeded row there is nothing to mark.
pub async fn update_asistencia(
    Json(body): Json<UpdateAsistencia>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Mensaje> {
    let (id_clase, id_usuario) = match (body.id_clase, body.id_usuario) {
        (Some(id_clase), Some(id_usuario)) if !id_clase.is_empty() => (id_clase, id_usuario),
        _ => return Err(Error::validation("Faltan parámetros")),
    };

    let res = sqlx::query(
        "UPDATE asistencia SET id_tp_asistencia = ? WHERE id_clase = ? AND id_usuario = ?",
    )
    .bind(TP_ASISTENCIA_PRESENTE)
    .bind(&id_clase)
    .bind(id_usuario)
    .execute(&pool)
    .await
    .map_err(Error::from)?;

    if res.rows_affected() == 0 {
        return Err(Error::not_found(
            "No se encontró la clase o el usuario para actualizar",
        ));
    }

    proceeds(Mensaje::new("Asistencia actualizada correctamente"))
}

/// Per-subject summary for a user: total sessions vs. sessions marked
/// presente, defaulting both to zero for subjects without sessions yet.
pub async fn conteo_asistencia(
    Path(usuario_id): Path<i32>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Vec<ConteoAsistencia>> {
    let materias = sqlx::query_as::<_, MateriaResumen>(
        "SELECT um.materia_id, m.nombre AS materia_nombre, m.descripcion \
         FROM usuario_materia um \
         INNER JOIN materias m ON um.materia_id = m.id \
         WHERE um.usuario_id = ?",
    )
    .bind(usuario_id)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    let conteos = sqlx::query_as::<_, ConteoClases>(
        "SELECT c.id_materia AS materia_id, \
                COUNT(DISTINCT c.id_clase) AS total_clases, \
                CAST(COALESCE(SUM(CASE WHEN a.id_tp_asistencia = ? THEN 1 ELSE 0 END), 0) AS SIGNED) AS total_asistencias \
         FROM clases c \
         LEFT JOIN asistencia a ON c.id_clase = a.id_clase AND a.id_usuario = ? \
         WHERE c.id_materia IN (SELECT materia_id FROM usuario_materia WHERE usuario_id = ?) \
         GROUP BY c.id_materia",
    )
    .bind(TP_ASISTENCIA_PRESENTE)
    .bind(usuario_id)
    .bind(usuario_id)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    proceeds(combina_conteos(materias, conteos))
}

pub async fn clases_faltantes(
    Path(usuario_id): Path<i32>,
    Query(filtro): Query<FiltroFaltantes>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Vec<ClaseFaltante>> {
    let materia_id = match filtro.materia_id {
        Some(materia_id) => materia_id,
        None => return Err(Error::validation("UsuarioId y materiaId son requeridos.")),
    };

    let clases = sqlx::query_as::<_, ClaseFaltante>(
        "SELECT c.id_clase, c.nombre AS clase_nombre, c.fecha_creacion \
         FROM clases c \
         LEFT JOIN asistencia a ON c.id_clase = a.id_clase AND a.id_usuario = ? \
         WHERE c.id_materia = ? AND (a.id_tp_asistencia IS NULL OR a.id_tp_asistencia != ?)",
    )
    .bind(usuario_id)
    .bind(materia_id)
    .bind(TP_ASISTENCIA_PRESENTE)
    .fetch_all(&pool)
    .await
    .map_err(Error::from)?;

    proceeds(clases)
}

fn combina_conteos(
    materias: Vec<MateriaResumen>,
    conteos: Vec<ConteoClases>,
) -> Vec<ConteoAsistencia> {
    materias
        .into_iter()
        .map(|materia| {
            let conteo = conteos
                .iter()
                .find(|conteo| conteo.materia_id == materia.materia_id);
            ConteoAsistencia {
                materia_id: materia.materia_id,
                materia_nombre: materia.materia_nombre,
                descripcion: materia.descripcion,
                total_clases: conteo.map(|c| c.total_clases).unwrap_or(0),
                total_asistencias: conteo.map(|c| c.total_asistencias).unwrap_or(0),
            }
        })
        .collect()
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct Inscrito {
    id: i32,
    nombre: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct MateriaResumen {
    materia_id: i32,
    materia_nombre: String,
    descripcion: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ConteoClases {
    materia_id: i32,
    total_clases: i64,
    total_asistencias: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConteoAsistencia {
    pub materia_id: i32,
    pub materia_nombre: String,
    pub descripcion: String,
    pub total_clases: i64,
    pub total_asistencias: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClaseFaltante {
    pub id_clase: String,
    pub clase_nombre: String,
    pub fecha_creacion: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct AsistenciaRegistrada {
    pub message: String,
    #[serde(rename = "totalAsistencias")]
    pub total_asistencias: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarAsistencia {
    #[serde(rename = "idClase")]
    pub id_clase: Option<String>,
    #[serde(rename = "idMateria")]
    pub id_materia: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAsistencia {
    pub id_clase: Option<String>,
    pub id_usuario: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FiltroFaltantes {
    #[serde(rename = "materiaId")]
    pub materia_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materia(materia_id: i32, nombre: &str) -> MateriaResumen {
        MateriaResumen {
            materia_id,
            materia_nombre: nombre.to_string(),
            descripcion: format!("Descripción de {}", nombre),
        }
    }

    #[test]
    fn summary_joins_counts_by_subject() {
        let materias = vec![materia(1, "Cálculo"), materia(2, "Física")];
        let conteos = vec![ConteoClases {
            materia_id: 1,
            total_clases: 3,
            total_asistencias: 2,
        }];

        let resumen = combina_conteos(materias, conteos);

        assert_eq!(resumen.len(), 2);
        assert_eq!(resumen[0].total_clases, 3);
        assert_eq!(resumen[0].total_asistencias, 2);
        // Subject without sessions yet defaults both counts to zero.
        assert_eq!(resumen[1].total_clases, 0);
        assert_eq!(resumen[1].total_asistencias, 0);
    }

    #[test]
    fn summary_is_empty_without_enrollments() {
        let resumen = combina_conteos(
            vec![],
            vec![ConteoClases {
                materia_id: 9,
                total_clases: 4,
                total_asistencias: 1,
            }],
        );
        assert!(resumen.is_empty());
    }

    #[test]
    fn registrar_payload_uses_camel_case_keys() {
        let body: RegistrarAsistencia =
            serde_json::from_str(r#"{"idClase": "A1B2C3", "idMateria": 4}"#).expect("deserialize");
        assert_eq!(body.id_clase.as_deref(), Some("A1B2C3"));
        assert_eq!(body.id_materia, Some(4));
    }

    #[test]
    fn seeded_response_uses_camel_case_total() {
        let body = serde_json::to_value(AsistenciaRegistrada {
            message: "Asistencia registrada exitosamente".to_string(),
            total_asistencias: 25,
        })
        .expect("serialize");
        assert_eq!(body["totalAsistencias"], 25);
    }

    #[test]
    fn update_payload_uses_snake_case_keys() {
        let body: UpdateAsistencia =
            serde_json::from_str(r#"{"id_clase": "A1B2C3", "id_usuario": 7}"#).expect("deserialize");
        assert_eq!(body.id_clase.as_deref(), Some("A1B2C3"));
        assert_eq!(body.id_usuario, Some(7));

        let body: UpdateAsistencia =
            serde_json::from_str(r#"{"id_clase": "A1B2C3"}"#).expect("deserialize");
        assert!(body.id_usuario.is_none());
    }
}
