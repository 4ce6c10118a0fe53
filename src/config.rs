use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "captcha-pipeline")]
#[command(about = "Solve slider, text, click and arithmetic captchas")]
#[command(version)]
pub struct Cli {
    /// Log filter (e.g. "info" or "captcha_pipeline=debug")
    #[arg(long, default_value = "info", env = "LOG_LEVEL", global = true)]
    pub log_level: String,

    /// File receiving a copy of the log output
    #[arg(long, value_name = "FILE", default_value = "logs/app.log", env = "LOG_FILE", global = true)]
    pub log_file: PathBuf,

    #[command(flatten)]
    pub serve: ServeArgs,

    /// Offline tools; without one the HTTP API is served
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split an image at Y into sliding piece and background
    Split {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Split row; the background starts at twice this row
        #[arg(value_name = "Y", allow_negative_numbers = true)]
        y: i64,

        /// Directory receiving sliding.png and back.png
        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// Keep only pixels of the given colours
    Isolate {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Preset colour name (red, green, blue, yellow, orange, purple, pink)
        #[arg(short, long = "color", value_name = "COLOR", required = true)]
        colors: Vec<String>,

        /// Output PNG path
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, short = 'p', default_value = "7777", env = "PORT")]
    pub port: u16,

    /// Directory holding text-detection.rten and text-recognition.rten
    /// (defaults to ~/.cache/ocrs)
    #[arg(long, value_name = "DIR", env = "OCRS_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

impl ServeArgs {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_flags_build_the_bind_address() {
        let cli = Cli::try_parse_from(["captcha-pipeline", "--host", "127.0.0.1", "--port", "8080"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.addr().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn log_file_is_accepted_after_a_subcommand() {
        let cli = Cli::try_parse_from(["captcha-pipeline", "split", "in.png", "10", "--log-file", "/tmp/x.log"]).unwrap();
        assert_eq!(cli.log_file, PathBuf::from("/tmp/x.log"));
    }

    #[test]
    fn isolate_requires_a_colour() {
        assert!(Cli::try_parse_from(["captcha-pipeline", "isolate", "in.png", "-o", "out.png"]).is_err());
    }

    #[test]
    fn split_accepts_negative_rows() {
        let cli = Cli::try_parse_from(["captcha-pipeline", "split", "in.png", "-5"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Split { y: -5, .. })));
    }
}
