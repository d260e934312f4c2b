//! `sketchport show` command
//!
//! Prints what the resolver made of the current settings: toolchain
//! locations, the board and port, and the exact command lines a build or
//! upload would run.

use std::path::Path;

use anyhow::Result;

use sketchport::core::{HostPlatform, Sketch};
use sketchport::util::GlobalContext;
use sketchport::{ArgumentSynthesizer, RecipeResolver};

use crate::cli::{GlobalArgs, ShowArgs};
use crate::commands::apply_overrides;

pub fn execute(global: &GlobalArgs, args: ShowArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let mut config = ctx.load_config();
    apply_overrides(&mut config, global);

    let sketch_path = ctx.find_sketch(args.sketch.as_deref(), &config).ok();
    let project_root = ctx.project_root();
    let resolver = RecipeResolver::load(config, HostPlatform::current(), &project_root);

    if let Some(key) = &args.key {
        let sketch = sketch_path
            .as_deref()
            .map(|p| Sketch::resolve(p, &project_root, None));
        println!("{}", resolver.expander(sketch.as_ref()).expand(key));
        return Ok(());
    }

    if args.prefs {
        for key in resolver.store().sorted_keys() {
            println!("{}={}", key, resolver.store().get(key).unwrap_or_default());
        }
        return Ok(());
    }

    show_summary(&resolver, sketch_path.as_deref());
    Ok(())
}

fn show_summary(resolver: &RecipeResolver, sketch_path: Option<&Path>) {
    let paths = resolver.paths();
    let config = resolver.config();
    let display = |p: &Option<std::path::PathBuf>| {
        p.as_ref()
            .map_or_else(|| "not found".to_string(), |p| p.display().to_string())
    };

    println!("Toolchain:");
    println!("  IDE:       {}", display(&paths.ide));
    println!("  Builder:   {}", display(&paths.builder));
    println!("  Packages:  {}", display(&paths.packages));
    println!("  Libraries: {}", display(&paths.library));
    if let Some(uploader) = &paths.uploader {
        println!("  Uploader:  {}", uploader.display());
    }
    println!();

    println!("Board:");
    println!("  FQBN:      {}", config.fqbn());
    println!(
        "  Port:      {}",
        resolver.check_serial_port().unwrap_or("not set")
    );
    println!("  Prefs:     {}", resolver.store().len());
    println!();

    let Some(path) = sketch_path else {
        println!("Sketch:      not found");
        return;
    };
    let sketch = Sketch::resolve(path, resolver.project_root(), None);
    let synth = ArgumentSynthesizer::new(resolver, &sketch);

    println!("Sketch:      {}", sketch.path().display());
    println!("  Build dir: {}", sketch.build_dir().display());
    println!("  Artifact:  {}", sketch.artifact_path().display());
    println!();
    println!("Compile:");
    println!("  {}", synth.compile_command());
    println!("Upload:");
    println!("  {}", synth.upload_command());
    if let Some(size) = synth.size_command() {
        println!("Size:");
        println!("  {}", size);
    }
}
