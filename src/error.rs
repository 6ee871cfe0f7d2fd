use thiserror::Error;

#[derive(Debug, Error)]
pub enum EsopsError {
    #[error("ssh tunnel failed: {0}")]
    TunnelFailed(String),
    #[error("curl connection failed: {0}")]
    BadConnection(String),
    #[error("elasticdump failed: {0}")]
    DumpFailed(String),
}
