//! Configuração do easeflow carregada a partir de `easeflow.toml`.
//!
//! A struct [`EngineConfig`] contém todos os parâmetros ajustáveis do motor:
//! limite de concorrência, TTL dos jobs, endpoints do upstream e os tempos
//! de polling por tipo de job. Valores ausentes no arquivo usam defaults.
//! Variáveis de ambiente têm precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::error::ConfigError;

/// Segredo compartilhado do handshake de upload assinado.
pub const DEFAULT_HANDSHAKE_SECRET: &str = "Q@D24=oueV%]OBS8i,%eK=5I|7WU$PeE";

/// Configuração de nível superior carregada de `easeflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Máximo de jobs conversando com o upstream ao mesmo tempo.
    #[serde(default = "default_max_concurrent_upstream")]
    pub max_concurrent_upstream: usize,

    /// Tempo de vida de um job, contado a partir da última atualização.
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,

    /// Intervalo entre varreduras do reaper.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default = "PollConfig::image")]
    pub image: PollConfig,

    #[serde(default = "PollConfig::video")]
    pub video: PollConfig,
}

/// Endpoints e timeouts do serviço de geração.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Origem enviada nos cabeçalhos `Origin`/`Referer`.
    #[serde(default = "default_site_origin")]
    pub site_origin: String,

    /// Host público de arquivos usado como fallback de upload.
    #[serde(default = "default_public_host_url")]
    pub public_host_url: String,

    #[serde(default = "default_handshake_secret")]
    pub handshake_secret: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Parâmetros do loop de polling de um tipo de job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PollConfig {
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

fn default_max_concurrent_upstream() -> usize {
    10
}

fn default_job_ttl_secs() -> u64 {
    6 * 60 * 60
}

fn default_reap_interval_secs() -> u64 {
    60
}

fn default_base_url() -> String {
    "https://www.aiease.ai/api/api".to_string()
}

fn default_site_origin() -> String {
    "https://www.aiease.ai".to_string()
}

fn default_public_host_url() -> String {
    "https://litterbox.catbox.moe/resources/internals/api.php".to_string()
}

fn default_handshake_secret() -> String {
    DEFAULT_HANDSHAKE_SECRET.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl PollConfig {
    /// Imagens: polling a cada 3s, até 30 minutos.
    pub fn image() -> Self {
        Self {
            poll_interval_ms: 3_000,
            max_wait_secs: 30 * 60,
        }
    }

    /// Vídeos: polling a cada 5s, até 15 minutos.
    pub fn video() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_wait_secs: 15 * 60,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            site_origin: default_site_origin(),
            public_host_url: default_public_host_url(),
            handshake_secret: default_handshake_secret(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_upstream: default_max_concurrent_upstream(),
            job_ttl_secs: default_job_ttl_secs(),
            reap_interval_secs: default_reap_interval_secs(),
            upstream: UpstreamConfig::default(),
            image: PollConfig::image(),
            video: PollConfig::video(),
        }
    }
}

impl EngineConfig {
    /// Carrega a configuração de `easeflow.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("easeflow.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<EngineConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo.
        if let Some(max) = env_parse::<usize>("MAX_CONCURRENT_UPSTREAM") {
            config.max_concurrent_upstream = max;
        }
        if let Some(ttl) = env_parse::<u64>("EASEFLOW_JOB_TTL_SECS") {
            config.job_ttl_secs = ttl;
        }
        if let Some(url) = std::env::var("EASEFLOW_UPSTREAM_BASE_URL")
            .ok()
            .filter(|u| !u.is_empty())
        {
            config.upstream.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita valores que travariam o motor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_upstream == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_upstream must be > 0".into(),
            ));
        }
        if self.max_concurrent_upstream > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "max_concurrent_upstream must be <= {}",
                Semaphore::MAX_PERMITS
            )));
        }
        if self.reap_interval_secs == 0 {
            return Err(ConfigError::Invalid("reap_interval_secs must be > 0".into()));
        }
        for (name, poll) in [("image", &self.image), ("video", &self.video)] {
            if poll.poll_interval_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}.poll_interval_ms must be > 0"
                )));
            }
        }
        Ok(())
    }

    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}
