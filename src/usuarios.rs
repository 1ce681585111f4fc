use axum::extract::Path;
use axum::Extension;
use sqlx::MySqlPool;

use crate::err::Error;
use crate::models::{Mensaje, Usuario};
use crate::{proceeds, Payload};

pub async fn listar_usuarios(Extension(pool): Extension<MySqlPool>) -> Payload<Vec<Usuario>> {
    // Explicit columns: the stored hash never leaves the database.
    let usuarios =
        sqlx::query_as::<_, Usuario>("SELECT id, nombre, correo, id_tp_usuario FROM usuario")
            .fetch_all(&pool)
            .await
            .map_err(Error::from)?;

    proceeds(usuarios)
}

/// Removes the user together with every enrollment and attendance row that
/// references it, in one transaction. Dropping the transaction on any
/// failure rolls the whole deletion back and returns the connection.
pub async fn eliminar_usuario(
    Path(id): Path<i32>,
    Extension(pool): Extension<MySqlPool>,
) -> Payload<Mensaje> {
    let mut tx = pool.begin().await.map_err(Error::from)?;

    sqlx::query("DELETE FROM asistencia WHERE id_usuario = ?")
        .bind(id)
        .execute(&mut tx)
        .await
        .map_err(Error::from)?;

    sqlx::query("DELETE FROM usuario_materia WHERE usuario_id = ?")
        .bind(id)
        .execute(&mut tx)
        .await
        .map_err(Error::from)?;

    sqlx::query("DELETE FROM usuario WHERE id = ?")
        .bind(id)
        .execute(&mut tx)
        .await
        .map_err(Error::from)?;

    tx.commit().await.map_err(Error::from)?;

    proceeds(Mensaje::new(format!(
        "Usuario con ID {} eliminado junto con sus relaciones.",
        id
    )))
}
