use crate::error::DbResult;
use std::future::Future;
use std::pin::Pin;

pub mod connection;
pub mod query;
pub mod schema;
pub mod store;

pub trait DbProvider: Send + Sync {
    fn get_connection<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = DbResult<connection::DbConnection<'a>>> + Send + 'a>>;
}
