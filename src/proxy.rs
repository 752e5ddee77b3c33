//! Proxy dispatch hook points (spec §1 "out of scope": proxy dispatch to
//! backend servers). The core only decides *when* to call out to a
//! backend; what actually happens over the wire is a caller concern.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait ProxyHooks: Send + Sync {
    async fn proxy_fetch(&self, backend: &str, external_mailbox: &str) -> Result<()>;

    async fn proxy_store(&self, backend: &str, external_mailbox: &str) -> Result<()>;
}
