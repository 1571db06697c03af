//! Interface de linha de comando do easeflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (image, video, models)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// easeflow: envia jobs de geração ao upstream e acompanha até o fim.
#[derive(Debug, Parser)]
#[command(name = "easeflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração.
    #[arg(long, global = true, default_value = "easeflow.toml")]
    pub config: PathBuf,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gera imagens a partir de um prompt.
    Image {
        prompt: String,

        /// Id do modelo ou alias (ex.: dall-e-3, seedream).
        #[arg(long)]
        model: Option<String>,

        /// Proporção no formato W:H.
        #[arg(long)]
        aspect_ratio: Option<String>,

        /// Resolução (ex.: 1K, 2K, 4K).
        #[arg(long)]
        resolution: Option<String>,

        /// Imagem de referência: arquivo local ou URL http(s). Pode repetir.
        #[arg(long = "reference", short = 'r')]
        references: Vec<String>,
    },

    /// Gera um vídeo a partir de um prompt.
    Video {
        prompt: String,

        /// Proporção (ignorada quando há imagem de referência).
        #[arg(long)]
        ratio: Option<String>,

        #[arg(long)]
        resolution: Option<String>,

        /// Duração em segundos.
        #[arg(long)]
        duration: Option<u32>,

        #[arg(long)]
        mode: Option<String>,

        /// Quadro de referência: arquivo local ou URL http(s).
        #[arg(long = "reference", short = 'r')]
        reference: Option<String>,
    },

    /// Lista o catálogo de modelos de imagem.
    Models,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_image_subcommand() {
        let cli = Cli::parse_from([
            "easeflow",
            "image",
            "a red fox",
            "--model",
            "seedream",
            "-r",
            "a.png",
            "-r",
            "https://x/b.png",
        ]);
        match cli.command {
            Command::Image {
                prompt,
                model,
                references,
                ..
            } => {
                assert_eq!(prompt, "a red fox");
                assert_eq!(model.as_deref(), Some("seedream"));
                assert_eq!(references, ["a.png", "https://x/b.png"]);
            }
            _ => panic!("expected Image command"),
        }
    }

    #[test]
    fn cli_parses_video_subcommand() {
        let cli = Cli::parse_from(["easeflow", "video", "waves", "--duration", "10"]);
        match cli.command {
            Command::Video {
                prompt,
                duration,
                reference,
                ..
            } => {
                assert_eq!(prompt, "waves");
                assert_eq!(duration, Some(10));
                assert!(reference.is_none());
            }
            _ => panic!("expected Video command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["easeflow", "--verbose", "--config", "x.toml", "models"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(cli.command, Command::Models));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
