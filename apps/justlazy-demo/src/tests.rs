use super::config::Command;
use super::config::DEFAULT_CLASS;
use super::config::DEFAULT_VIEWPORT_HEIGHT;
use super::config::parse_args;
use super::decode::decode_html;
use super::decode::parse_charset_from_html_prefix;
use super::fs_loader::FsImageLoader;
use super::fs_loader::base_url_for;
use super::fs_loader::decode_image;
use super::simulate;
use jl_page::ImageLoad;
use jl_page::ImageLoader;
use jl_page::Page;
use jl_page::PageConfig;
use jl_page::StaticImageLoader;
use std::io::Cursor;
use std::path::PathBuf;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|arg| (*arg).to_owned()).collect()
}

fn run_config(list: &[&str]) -> super::DemoConfig {
    match parse_args(args(list), None) {
        Ok(Command::Run(config)) => config,
        other => panic!("expected a run command, got {other:?}"),
    }
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

#[test]
fn parses_defaults_and_flags() {
    let config = run_config(&["page.html"]);
    assert_eq!(config.page, PathBuf::from("page.html"));
    assert_eq!(config.class_name, DEFAULT_CLASS);
    assert_eq!(config.viewport_height, DEFAULT_VIEWPORT_HEIGHT);
    assert_eq!(config.threshold, 0.0);
    assert!(!config.print_html);

    let config = run_config(&[
        "--threshold",
        "-150",
        "page.html",
        "--class",
        "lazy",
        "--viewport-height",
        "600",
        "--step",
        "50",
        "--print-html",
    ]);
    assert_eq!(config.threshold, -150.0);
    assert_eq!(config.class_name, "lazy");
    assert_eq!(config.viewport_height, 600.0);
    assert_eq!(config.step, 50.0);
    assert!(config.print_html);
}

#[test]
fn environment_sets_viewport_but_flag_wins() {
    let from_env = parse_args(args(&["page.html"]), Some("640".to_owned()));
    assert!(matches!(from_env, Ok(Command::Run(ref config)) if config.viewport_height == 640.0));

    let from_flag = parse_args(
        args(&["page.html", "--viewport-height", "900"]),
        Some("640".to_owned()),
    );
    assert!(matches!(from_flag, Ok(Command::Run(ref config)) if config.viewport_height == 900.0));

    assert!(parse_args(args(&["page.html"]), Some("tall".to_owned())).is_err());
}

#[test]
fn rejects_bad_arguments() {
    assert!(parse_args(args(&[]), None).is_err());
    assert!(parse_args(args(&["a.html", "b.html"]), None).is_err());
    assert!(parse_args(args(&["a.html", "--step", "0"]), None).is_err());
    assert!(parse_args(args(&["a.html", "--threshold"]), None).is_err());
    assert!(parse_args(args(&["a.html", "--threshold", "NaN"]), None).is_err());
    assert!(parse_args(args(&["a.html", "--verbose"]), None).is_err());
    assert_eq!(parse_args(args(&["--help"]), None), Ok(Command::Help));
}

#[test]
fn prefers_meta_charset_for_html() {
    let html = "<html><head><meta charset=\"windows-1252\"></head><body>hello</body></html>";
    let parsed = parse_charset_from_html_prefix(html.as_bytes());
    assert_eq!(parsed.as_deref(), Some("windows-1252"));
}

#[test]
fn decodes_legacy_charset_and_bom() {
    let latin = b"<meta charset=iso-8859-1><p>caf\xE9</p>";
    assert!(decode_html(latin).contains("caf\u{e9}"));

    let bom = b"\xEF\xBB\xBF<p>\xE2\x82\xAC</p>";
    assert_eq!(decode_html(bom), "<p>\u{20AC}</p>");
}

#[test]
fn decodes_real_image_dimensions() {
    assert_eq!(
        decode_image(&png_bytes(3, 2)),
        ImageLoad::Loaded {
            width: 3,
            height: 2
        }
    );
    assert!(matches!(decode_image(b"not an image"), ImageLoad::Failed(_)));
}

/// Rewrites the IHDR dimensions of an encoded PNG, keeping its checksum valid.
fn with_declared_size(mut png: Vec<u8>, width: u32, height: u32) -> Vec<u8> {
    png[16..20].copy_from_slice(&width.to_be_bytes());
    png[20..24].copy_from_slice(&height.to_be_bytes());
    let crc = crc32(&png[12..29]);
    png[29..33].copy_from_slice(&crc.to_be_bytes());
    png
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFF_u32;
    for byte in bytes {
        crc ^= u32::from(*byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

#[test]
fn oversized_header_is_rejected_before_decoding() {
    let huge = with_declared_size(png_bytes(1, 1), 8192, 8192);
    assert_eq!(
        decode_image(&huge),
        ImageLoad::Failed("image too large (8192x8192)".to_owned())
    );

    let tall_but_small = with_declared_size(png_bytes(1, 1), 1, 4096);
    assert_eq!(
        decode_image(&tall_but_small),
        ImageLoad::Loaded {
            width: 1,
            height: 4096
        }
    );
}

#[test]
fn filesystem_loader_resolves_relative_to_page() {
    let dir = std::env::temp_dir().join(format!("justlazy-demo-{}", std::process::id()));
    std::fs::create_dir_all(dir.join("img")).expect("create dir");
    let page_path = dir.join("index.html");
    std::fs::write(&page_path, "<html></html>").expect("write page");
    std::fs::write(dir.join("img").join("cat.png"), png_bytes(4, 5)).expect("write image");

    let mut loader = FsImageLoader::new(base_url_for(&page_path).expect("base url"));
    assert_eq!(
        loader.load("img/cat.png"),
        ImageLoad::Loaded {
            width: 4,
            height: 5
        }
    );
    assert!(matches!(loader.load("img/missing.png"), ImageLoad::Failed(_)));
    assert!(matches!(
        loader.load("https://example.test/cat.png"),
        ImageLoad::Failed(_)
    ));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn simulation_scrolls_until_every_placeholder_loads() {
    let page = Page::from_html(
        r#"<body>
<span class="justlazy-placeholder" data-src="a.png" data-alt="a"></span>
<div style="height: 3000px"></div>
<span class="justlazy-placeholder" data-src="b.png" data-alt=""></span>
<span class="justlazy-placeholder" data-alt="no source"></span>
<div style="height: 400px"></div>
</body>"#,
        PageConfig::default(),
        StaticImageLoader::new().with_fallback(10, 200),
    );
    let config = run_config(&["page.html", "--step", "500", "--print-html"]);

    let report = simulate(page, &config).expect("simulation");

    assert_eq!(report.placeholders, 3);
    assert_eq!(report.immediate, 1);
    assert_eq!(report.counters.replaced, 2);
    assert_eq!(report.counters.loaded, 2);
    assert_eq!(report.counters.rejected, 1);
    assert_eq!(report.still_pending, 0);
    assert!(report.scroll_steps > 0);
    assert!(
        report
            .html
            .as_deref()
            .is_some_and(|html| html.contains("<img alt=\"\" src=\"b.png\">"))
    );
}
