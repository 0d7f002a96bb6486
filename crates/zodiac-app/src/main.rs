//! Zodiac command-line entry point.
//!
//! Loads one `gemini://` or `file://` URL on a worker thread. Progress
//! lines go to stderr as they arrive; the page goes to stdout, either as
//! raw content or (with `--json`) as `{"mimetype": ..., "content": ...}`.
//! Exits non-zero when the load fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use zodiac_core::config::ZodiacConfig;
use zodiac_core::{FetchResult, LoaderEvent, LoaderRegistry, PageLoader};

const USAGE: &str = "Usage: zodiac [--config FILE] [--json] URL";

// ---------------------------------------------------------------------------
// CLI parsing
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
struct Args {
    /// TOML configuration file.
    config: Option<PathBuf>,
    /// Print the result as JSON instead of raw content.
    json: bool,
    url: String,
}

fn parse_args(mut iter: impl Iterator<Item = String>) -> std::result::Result<Args, String> {
    let mut config = None;
    let mut json = false;
    let mut url = None;
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let path = iter.next().ok_or("--config needs a file")?;
                config = Some(PathBuf::from(path));
            },
            "--json" => json = true,
            other if other.starts_with("--") => return Err(format!("Unknown argument: {other}")),
            other => {
                if url.replace(other.to_string()).is_some() {
                    return Err("only one URL may be given".to_string());
                }
            },
        }
    }
    let url = url.ok_or("missing URL")?;
    Ok(Args { config, json, url })
}

fn load_config(path: &Path) -> Result<ZodiacConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    ZodiacConfig::from_toml_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn render(result: &FetchResult, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(result)? + "\n");
    }
    let mut out = result.content.clone();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("{USAGE}");
            std::process::exit(2);
        },
    };

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ZodiacConfig::default(),
    };
    let registry = LoaderRegistry::new(&config)?;
    log::debug!("loaders: {}", registry.schemes().join(", "));

    let (mut loader, events) = PageLoader::new(Arc::new(registry));
    loader.set_url(&args.url);
    let fetch = loader.load_url()?;
    // The channel closes once the worker, the last sender, is done.
    drop(loader);

    for event in events {
        match event {
            LoaderEvent::Status(msg) => eprintln!("{msg}"),
            LoaderEvent::Content(result) => print!("{}", render(&result, args.json)?),
        }
    }

    if fetch.join().is_err() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn url_only() {
        let args = parse(&["gemini://example.com/"]).unwrap();
        assert_eq!(
            args,
            Args {
                config: None,
                json: false,
                url: "gemini://example.com/".to_string(),
            }
        );
    }

    #[test]
    fn all_flags() {
        let args = parse(&["--json", "--config", "zodiac.toml", "file:///tmp/x.gmi"]).unwrap();
        assert!(args.json);
        assert_eq!(args.config, Some(PathBuf::from("zodiac.toml")));
        assert_eq!(args.url, "file:///tmp/x.gmi");
    }

    #[test]
    fn missing_url() {
        assert!(parse(&["--json"]).is_err());
    }

    #[test]
    fn config_without_path() {
        assert!(parse(&["gemini://example.com/", "--config"]).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert_eq!(
            parse(&["--verbose", "gemini://example.com/"]).unwrap_err(),
            "Unknown argument: --verbose"
        );
    }

    #[test]
    fn two_urls() {
        assert!(parse(&["gemini://a/", "gemini://b/"]).is_err());
    }

    #[test]
    fn render_raw_adds_newline() {
        let result = FetchResult::new("text/gemini", "# Title");
        assert_eq!(render(&result, false).unwrap(), "# Title\n");
    }

    #[test]
    fn render_json() {
        let result = FetchResult::new("text/plain", "Not found");
        let out = render(&result, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["mimetype"], "text/plain");
        assert_eq!(value["content"], "Not found");
    }

    #[test]
    fn load_config_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zodiac.toml");
        std::fs::write(&path, "[gemini]\nmax_redirects = 3\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.gemini.max_redirects, 3);
    }

    #[test]
    fn load_config_missing_file() {
        let err = load_config(Path::new("/no/such/zodiac.toml")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
