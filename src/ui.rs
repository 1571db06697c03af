//! Interface de terminal do easeflow: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente um job
//! até o estado terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use easeflow::generation::{AspectFormat, ImageModel};
use easeflow::state_machine::{JobResult, JobStatus, JobView};
use easeflow::upload::UploadStrategy;

/// Indicador visual de progresso de um job no terminal.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl JobProgress {
    /// Inicia o spinner com o id e o prompt do job.
    pub fn start(job_id: &str, prompt: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]")
        {
            pb.set_style(style);
        }
        pb.set_message(format!("queued: {job_id} {}", truncate(prompt, 40)));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Atualiza a mensagem do spinner com o status atual.
    pub fn update(&self, view: &JobView, queued: usize) {
        let msg = match view.status {
            JobStatus::Queued => format!("queued ({queued} waiting): {}", view.id),
            status => format!("{status}: {}", view.id),
        };
        self.pb.set_message(msg);
    }

    /// Finaliza o spinner e imprime o resultado do job.
    pub fn finish(&self, view: &JobView) {
        self.pb.finish_and_clear();
        match (&view.result, &view.error) {
            (Some(JobResult::Images { images }), _) => {
                println!("  {} {} image(s)", self.green.apply_to("✓"), images.len());
                for image in images {
                    println!("    {}", image.url);
                }
            }
            (
                Some(JobResult::Video {
                    video_url,
                    thumbnail_url,
                }),
                _,
            ) => {
                println!("  {} video ready", self.green.apply_to("✓"));
                println!("    {video_url}");
                if let Some(thumb) = thumbnail_url {
                    println!("    {}", self.dim.apply_to(format!("thumbnail: {thumb}")));
                }
            }
            (None, Some(error)) => {
                let kind = view
                    .error_kind
                    .map(|k| format!("[{k}] "))
                    .unwrap_or_default();
                println!("  {} {kind}{error}", self.red.apply_to("✗"));
            }
            (None, None) => {
                println!("  {} job vanished before finishing", self.red.apply_to("✗"));
            }
        }
    }
}

/// Imprime o catálogo de modelos em formato de tabela.
pub fn print_models(models: &[ImageModel]) {
    let bold = Style::new().bold();
    println!(
        "{}",
        bold.apply_to(format!(
            "{:<22} {:<22} {:<5} {:<7} {:<5} {:<12} ALIASES",
            "ID", "GEN TYPE", "I2I", "ASPECT", "RES", "UPLOAD"
        ))
    );
    for m in models {
        println!(
            "{:<22} {:<22} {:<5} {:<7} {:<5} {:<12} {}",
            m.id,
            m.gen_type,
            yes_no(m.supports_i2i),
            match m.aspect_format {
                AspectFormat::Colon => "w:h",
                AspectFormat::Dash => "w-h",
            },
            yes_no(m.supports_resolution),
            match m.upload {
                UploadStrategy::Signed => "signed",
                UploadStrategy::PublicHost => "public host",
            },
            m.aliases.join(", ")
        );
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}…")
    }
}
