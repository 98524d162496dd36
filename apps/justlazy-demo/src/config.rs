use std::path::PathBuf;

pub(crate) const DEFAULT_CLASS: &str = "justlazy-placeholder";
pub(crate) const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;
pub(crate) const DEFAULT_SCROLL_STEP: f64 = 200.0;
pub(crate) const VIEWPORT_HEIGHT_ENV: &str = "JUSTLAZY_VIEWPORT_HEIGHT";

pub(crate) const USAGE: &str = "usage: justlazy-demo <page.html> [--class NAME] [--threshold PX] \
[--viewport-height PX] [--step PX] [--print-html]";

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DemoConfig {
    pub(crate) page: PathBuf,
    pub(crate) class_name: String,
    pub(crate) threshold: f64,
    pub(crate) viewport_height: f64,
    pub(crate) step: f64,
    pub(crate) print_html: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Run(DemoConfig),
    Help,
}

/// `env_viewport` is the raw value of [`VIEWPORT_HEIGHT_ENV`]; the flag wins over it.
pub(crate) fn parse_args(
    args: impl IntoIterator<Item = String>,
    env_viewport: Option<String>,
) -> Result<Command, String> {
    let mut page: Option<PathBuf> = None;
    let mut class_name = DEFAULT_CLASS.to_owned();
    let mut threshold = 0.0;
    let mut viewport_height = match env_viewport {
        Some(raw) => parse_positive(VIEWPORT_HEIGHT_ENV, &raw)?,
        None => DEFAULT_VIEWPORT_HEIGHT,
    };
    let mut step = DEFAULT_SCROLL_STEP;
    let mut print_html = false;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--print-html" => print_html = true,
            "--class" => {
                class_name = next_value(&mut args, "--class")?;
                if class_name.trim().is_empty() {
                    return Err("--class needs a non-empty class name".to_owned());
                }
            }
            "--threshold" => {
                let raw = next_value(&mut args, "--threshold")?;
                threshold = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|value| value.is_finite())
                    .ok_or_else(|| format!("--threshold expects a number of pixels, got `{raw}`"))?;
            }
            "--viewport-height" => {
                let raw = next_value(&mut args, "--viewport-height")?;
                viewport_height = parse_positive("--viewport-height", &raw)?;
            }
            "--step" => {
                let raw = next_value(&mut args, "--step")?;
                step = parse_positive("--step", &raw)?;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("unknown option `{flag}`"));
            }
            path => {
                if page.is_some() {
                    return Err(format!("unexpected extra argument `{path}`"));
                }
                page = Some(PathBuf::from(path));
            }
        }
    }

    let page = page.ok_or_else(|| format!("missing page path\n{USAGE}"))?;
    Ok(Command::Run(DemoConfig {
        page,
        class_name,
        threshold,
        viewport_height,
        step,
        print_html,
    }))
}

fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next()
        .ok_or_else(|| format!("missing value after {flag}"))
}

fn parse_positive(source: &str, raw: &str) -> Result<f64, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
        .ok_or_else(|| format!("{source} expects a positive number of pixels, got `{raw}`"))
}
