use crate::Uri;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::Serialize;

pub async fn handler404(path: Uri) -> (StatusCode, Json<Error>) {
    (
        StatusCode::NOT_FOUND,
        Json(Error::NotFound {
            message: format!("Ruta no encontrada: {}", path),
        }),
    )
}

/// Error taxonomy of the service. Every variant serializes to the JSON body
/// the caller sees; `Internal` keeps its diagnostic `kind` out of the wire
/// and only the generic product message is exposed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Error {
    Validation {
        message: String,
    },
    NotFound {
        message: String,
    },
    // Duplicate-correo conflicts reuse the original product message, with
    // the `error` key the recovery flow in the app expects.
    Conflict {
        error: String,
    },
    Internal {
        #[serde(skip)]
        kind: &'static str,
        message: String,
    },
}

impl Error {
    pub fn validation<S: Into<String>>(msg: S) -> Error {
        Error::Validation {
            message: msg.into(),
        }
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Error {
        Error::Conflict { error: msg.into() }
    }

    pub fn internal<S: Into<String>>(kind: &'static str, msg: S) -> Error {
        Error::Internal {
            kind,
            message: msg.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            // The product surfaces duplicate-correo as a plain server error
            // with a domain message, so both map to 500.
            Error::Conflict { .. } | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        log::error!("database query failed: {}", err);
        Error::internal("DatabaseError", "Error en la consulta")
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        log::error!("password hashing failed: {}", err);
        Error::internal("HashError", "Error al procesar la contraseña")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            Error::validation("faltan campos").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::not_found("no existe").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::conflict("correo duplicado").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::internal("DatabaseError", "error").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn bodies_expose_only_public_fields() {
        let body = serde_json::to_value(Error::validation("Por favor, proporciona correo"))
            .expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({ "message": "Por favor, proporciona correo" })
        );

        // Conflicts keep the `error` key of the original recovery flow.
        let body = serde_json::to_value(Error::conflict("Correo ya registrado")).expect("serialize");
        assert_eq!(body, serde_json::json!({ "error": "Correo ya registrado" }));

        // The diagnostic kind never reaches the wire.
        let body = serde_json::to_value(Error::internal("DatabaseError", "Error en la consulta"))
            .expect("serialize");
        assert_eq!(body, serde_json::json!({ "message": "Error en la consulta" }));
    }
}
