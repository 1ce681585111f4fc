use chrono::NaiveDateTime;
use serde::Serialize;

/// id_tp_asistencia once the student was marked present.
pub const TP_ASISTENCIA_PRESENTE: i32 = 1;
/// id_tp_asistencia seeded when a class roster is initialized.
pub const TP_ASISTENCIA_PENDIENTE: i32 = 2;

/// id_tp_usuario assigned to every fresh registration.
pub const TP_USUARIO_DEFECTO: i32 = 1;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Usuario {
    pub id: i32,
    pub nombre: String,
    pub correo: String,
    pub id_tp_usuario: i32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Materia {
    pub id: i32,
    pub nombre: String,
    pub descripcion: String,
}

/// Subject as seen from a user's enrollment (join row).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MateriaInscrita {
    pub materia_id: i32,
    pub nombre: String,
    pub descripcion: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Clase {
    pub id_materia: i32,
    pub id_clase: String,
    pub nombre: String,
    pub fecha_creacion: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Alumno {
    pub id: i32,
    pub nombre: String,
    pub correo: String,
}

/// Roster entry of a class, carrying the attendance status code.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AlumnoAsistencia {
    pub id: i32,
    pub nombre: String,
    pub correo: String,
    pub id_tp_asistencia: i32,
}

/// Roster envelope: `{"alumnos": [...]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ListaAlumnos<T> {
    pub alumnos: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Mensaje {
    pub message: String,
}

impl Mensaje {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mensaje_serializes_as_message_key() {
        let body = serde_json::to_value(Mensaje::new("Usuario fue registrado con éxito."))
            .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({ "message": "Usuario fue registrado con éxito." })
        );
    }
}
