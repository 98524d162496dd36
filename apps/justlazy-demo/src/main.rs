mod config;
mod decode;
mod fs_loader;

#[cfg(test)]
mod tests;

use config::Command;
use config::DemoConfig;
use fs_loader::FsImageLoader;
use jl_core::DocumentHost;
use jl_core::LazyError;
use jl_core::LazyResult;
use jl_core::EventKind;
use jl_lazy::Activation;
use jl_lazy::LazyOptions;
use jl_page::DEFAULT_LOAD_FLUSH_LIMIT;
use jl_page::LoadStatus;
use jl_page::Page;
use jl_page::PageConfig;
use std::cell::RefCell;
use std::fs;
use std::process::ExitCode;
use std::rc::Rc;

/// Totals collected by the option callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DemoCounters {
    replaced: usize,
    loaded: usize,
    rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DemoReport {
    placeholders: usize,
    immediate: usize,
    scroll_steps: usize,
    still_pending: usize,
    counters: DemoCounters,
    load_lines: Vec<String>,
    html: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();

    let env_viewport = std::env::var(config::VIEWPORT_HEIGHT_ENV).ok();
    let config = match config::parse_args(std::env::args().skip(1), env_viewport) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{}", config::USAGE);
            return ExitCode::SUCCESS;
        }
        Err(error) => {
            eprintln!("justlazy startup error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config) {
        Ok(report) => {
            print_report(&config, &report);
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("justlazy startup error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &DemoConfig) -> LazyResult<DemoReport> {
    let bytes = fs::read(&config.page).map_err(|error| {
        LazyError::new(
            "demo.read_failed",
            format!("failed reading `{}`: {error}", config.page.display()),
        )
    })?;
    let html = decode::decode_html(&bytes);
    let loader = FsImageLoader::new(fs_loader::base_url_for(&config.page)?);
    let page = Page::from_html(
        &html,
        PageConfig {
            viewport_height: Some(config.viewport_height),
            client_height: config.viewport_height,
            ..PageConfig::default()
        },
        loader,
    );
    simulate(page, config)
}

/// Registers every placeholder, then scrolls to the bottom one step at a
/// time, letting pending image loads finish after each step.
fn simulate(mut page: Page, config: &DemoConfig) -> LazyResult<DemoReport> {
    let counters = Rc::new(RefCell::new(DemoCounters::default()));
    let options = demo_options(&counters).with_threshold(config.threshold);

    let activations =
        jl_lazy::register_lazy_load_by_class(&mut page, &config.class_name, &options)?;
    let immediate = activations
        .iter()
        .filter(|activation| matches!(activation, Activation::Immediate(_)))
        .count();
    page.flush_image_loads(DEFAULT_LOAD_FLUSH_LIMIT);

    let mut scroll_steps = 0_usize;
    while page.scroll_by(config.step) {
        scroll_steps = scroll_steps.saturating_add(1);
        page.flush_image_loads(DEFAULT_LOAD_FLUSH_LIMIT);
    }

    let load_lines = page
        .load_log()
        .iter()
        .map(|record| match &record.status {
            LoadStatus::Loaded { width, height } => {
                format!("loaded {} ({width}x{height})", record.src)
            }
            LoadStatus::Failed { reason } => format!("failed {}: {reason}", record.src),
        })
        .collect();

    let counters = counters.borrow().clone();
    Ok(DemoReport {
        placeholders: activations.len(),
        immediate,
        scroll_steps,
        still_pending: page.listener_count(EventKind::Scroll),
        counters,
        load_lines,
        html: config.print_html.then(|| page.to_html()),
    })
}

fn demo_options(counters: &Rc<RefCell<DemoCounters>>) -> LazyOptions<Page> {
    let on_replace = Rc::clone(counters);
    let on_load = Rc::clone(counters);
    let on_error = Rc::clone(counters);

    LazyOptions::new()
        .with_on_replace(move |page: &mut Page, img: u64| {
            on_replace.borrow_mut().replaced += 1;
            log::info!(
                "replaced placeholder with `{}` at scroll {}",
                page.get_attribute(img, "src").unwrap_or_default(),
                page.scroll_y()
            );
        })
        .with_on_load(move |page: &mut Page, img: u64| {
            on_load.borrow_mut().loaded += 1;
            log::info!(
                "loaded `{}`",
                page.get_attribute(img, "src").unwrap_or_default()
            );
        })
        .with_on_error(move |page: &mut Page, placeholder: u64| {
            on_error.borrow_mut().rejected += 1;
            log::warn!(
                "placeholder {placeholder} is missing {} or {}: {}",
                jl_lazy::SRC_ATTRIBUTE,
                jl_lazy::ALT_ATTRIBUTE,
                page.document().outer_html(placeholder)
            );
        })
}

fn print_report(config: &DemoConfig, report: &DemoReport) {
    println!("page: {}", config.page.display());
    println!(
        "placeholders: {} with class `{}` ({} loaded on registration)",
        report.placeholders, config.class_name, report.immediate
    );
    println!(
        "scrolled {} steps of {}px (viewport {}px, threshold {}px)",
        report.scroll_steps, config.step, config.viewport_height, config.threshold
    );
    println!(
        "replaced: {}, loaded: {}, rejected: {}, still pending: {}",
        report.counters.replaced,
        report.counters.loaded,
        report.counters.rejected,
        report.still_pending
    );
    for line in &report.load_lines {
        println!("  {line}");
    }
    if let Some(html) = &report.html {
        println!("{html}");
    }
}
