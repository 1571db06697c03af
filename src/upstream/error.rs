//! Tipos de erro para o cliente do serviço de geração.
//!
//! Define [`UpstreamError`] com variantes para falhas de rede, respostas
//! bloqueadas na borda (HTML no lugar de JSON), corpos malformados e
//! envelopes com `code` diferente de 200.

use thiserror::Error;

use crate::error::ErrorKind;

/// Erros que podem ocorrer ao conversar com o upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Falha de rede subjacente (DNS, conexão recusada, TLS, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Status HTTP inesperado, com o início do corpo para depuração.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// O upstream devolveu uma página HTML: a requisição foi interceptada
    /// na borda (proxy/CDN), geralmente por bloqueio do IP de saída.
    #[error("upstream returned an HTML page (HTTP {status}), request was likely blocked at the edge")]
    Blocked { status: u16 },

    /// Corpo que não é JSON válido ou não tem o formato esperado.
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// Envelope JSON com `code` diferente de 200.
    #[error("upstream error (code {code}): {message}")]
    Envelope { code: i64, message: String },

    /// Envelope de sucesso sem um campo obrigatório.
    #[error("upstream response missing {0}")]
    MissingField(&'static str),
}

impl UpstreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpstreamError::Network(_) => ErrorKind::Transport,
            _ => ErrorKind::Protocol,
        }
    }
}
