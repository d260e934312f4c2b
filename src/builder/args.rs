//! Argument synthesis for builder, uploader and size invocations.
//!
//! Every vector is built fresh per invocation from the resolver snapshot
//! and the active sketch. Synthesis never fails: a missing preference
//! yields an empty or best-effort argument and the external tool reports
//! the problem through its exit code.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::platform::HostPlatform;
use crate::core::sketch::Sketch;
use crate::resolver::{split_args, RecipeResolver, ToolchainPaths, UPLOADER_KEY};
use crate::util::config::Config;
use crate::util::process::ProcessBuilder;

/// Flash-write directive for avrdude-compatible uploaders.
fn flash_directive(artifact: &Path) -> String {
    format!("-Uflash:w:{}:i", artifact.display())
}

fn dir_arg(dir: Option<&PathBuf>, tail: &str) -> String {
    let base = dir.map(|p| p.display().to_string()).unwrap_or_default();
    if tail.is_empty() {
        base
    } else {
        format!("{}/{}", base, tail)
    }
}

/// A program together with the arguments to run it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The program to run
    pub program: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    /// Turn this spec into a runnable process.
    pub fn to_process(&self, cwd: &Path) -> ProcessBuilder {
        ProcessBuilder::new(&self.program).args(&self.args).cwd(cwd)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// How the firmware reaches the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStrategy {
    /// User-configured uploader with templated option tokens
    Custom(PathBuf),
    /// The board platform's `tools.<tool>.upload.pattern`
    Platform { tool: String, program: String },
    /// avrdude shipped with the IDE, driven by the config's part and programmer
    Avrdude,
}

/// Arguments shared by compile and preference-dump invocations.
pub fn minimal_arguments(paths: &ToolchainPaths, config: &Config, platform: HostPlatform) -> Vec<String> {
    let logger = if config.build.verbose { "human" } else { "machine" };
    let ide = paths.ide.as_ref();

    let args = vec![
        "-logger".to_string(),
        logger.to_string(),
        "-hardware".to_string(),
        dir_arg(ide, "hardware"),
        "-hardware".to_string(),
        dir_arg(paths.packages.as_ref(), ""),
        "-tools".to_string(),
        dir_arg(ide, "tools-builder"),
        "-tools".to_string(),
        dir_arg(ide, "hardware/tools/avr"),
        "-tools".to_string(),
        dir_arg(paths.packages.as_ref(), ""),
        "-built-in-libraries".to_string(),
        dir_arg(ide, "libraries"),
        "-libraries".to_string(),
        dir_arg(paths.library.as_ref(), ""),
        format!("-fqbn={}", config.fqbn()),
    ];

    args.iter().map(|a| platform.native_path(a)).collect()
}

/// Builds argument vectors for one sketch against one resolver snapshot.
pub struct ArgumentSynthesizer<'a> {
    resolver: &'a RecipeResolver,
    sketch: &'a Sketch,
}

impl<'a> ArgumentSynthesizer<'a> {
    pub fn new(resolver: &'a RecipeResolver, sketch: &'a Sketch) -> Self {
        ArgumentSynthesizer { resolver, sketch }
    }

    /// Compile vector; the sketch path is always the last element.
    pub fn build_arguments(&self) -> Vec<String> {
        let config = self.resolver.config();
        let paths = self.resolver.paths();
        let platform = self.resolver.platform();
        let avr_tools = dir_arg(paths.ide.as_ref(), "hardware/tools/avr");

        let mut args = minimal_arguments(paths, config, platform);
        let rest = [
            "-compile".to_string(),
            "-build-path".to_string(),
            self.sketch.build_dir().display().to_string(),
            format!("-warnings={}", config.build.warn_mode),
            format!("-prefs=build.warn_data_percentage={}", config.build.warn_percentage),
            format!("-prefs=runtime.tools.avr-gcc.path={}", avr_tools),
            format!("-prefs=runtime.tools.avrdude.path={}", avr_tools),
            format!("-prefs=runtime.tools.arduinoOTA.path={}", avr_tools),
        ];
        args.extend(rest.iter().map(|a| platform.native_path(a)));
        args.extend(config.build.compile_options.iter().cloned());
        if config.build.verbose {
            args.push("-verbose".to_string());
        }
        args.push(platform.native_path(&self.sketch.path().display().to_string()));
        args
    }

    /// The complete compile command.
    pub fn compile_command(&self) -> CommandSpec {
        let program = self
            .resolver
            .paths()
            .builder
            .clone()
            .unwrap_or_else(|| PathBuf::from("arduino-builder"));
        CommandSpec::new(program).args(self.build_arguments())
    }

    /// Which upload strategy applies to the current settings.
    pub fn upload_strategy(&self) -> UploadStrategy {
        if let Some(uploader) = &self.resolver.paths().uploader {
            return UploadStrategy::Custom(uploader.clone());
        }
        let store = self.resolver.store();
        match (store.get("upload.tool"), store.get(UPLOADER_KEY)) {
            (Some(tool), Some(program)) if !program.is_empty() => UploadStrategy::Platform {
                tool: tool.to_string(),
                program: program.to_string(),
            },
            _ => UploadStrategy::Avrdude,
        }
    }

    /// Upload vector, without the executable itself.
    pub fn upload_arguments(&self) -> Vec<String> {
        self.upload_for(&self.upload_strategy()).args
    }

    /// The complete upload command.
    pub fn upload_command(&self) -> CommandSpec {
        self.upload_for(&self.upload_strategy())
    }

    fn upload_for(&self, strategy: &UploadStrategy) -> CommandSpec {
        let platform = self.resolver.platform();
        match strategy {
            UploadStrategy::Custom(program) => {
                CommandSpec::new(program.clone()).args(self.custom_upload_arguments())
            }
            UploadStrategy::Platform { tool, program } => {
                let pattern = self
                    .resolver
                    .expander(Some(self.sketch))
                    .expand(&format!("tools.{}.upload.pattern", tool));
                let args = split_args(&pattern).into_iter().skip(1);
                recipe_command(platform, program, args)
            }
            UploadStrategy::Avrdude => {
                let ide = self.resolver.paths().ide.as_ref();
                let program = platform.native_path(&format!(
                    "{}{}",
                    dir_arg(ide, "hardware/tools/avr/bin/avrdude"),
                    platform.exe_suffix()
                ));
                CommandSpec::new(program).args(self.avrdude_arguments())
            }
        }
    }

    fn custom_upload_arguments(&self) -> Vec<String> {
        let upload = &self.resolver.config().upload;
        let artifact = self.sketch.artifact_path().display().to_string();
        let baud = upload.baud_rate.to_string();
        let port = upload.serial_port.clone().unwrap_or_default();

        let mut targets_artifact = false;
        let mut args: Vec<String> = upload
            .options
            .iter()
            .map(|opt| {
                targets_artifact |= opt.contains("$TARGET");
                opt.replace("$TARGET", &artifact)
                    .replace("$BAUDRATE", &baud)
                    .replace("$SERIALPORT", &port)
            })
            .collect();
        if !targets_artifact {
            args.push(flash_directive(&self.sketch.artifact_path()));
        }

        let platform = self.resolver.platform();
        args.iter().map(|a| platform.native_path(a)).collect()
    }

    fn avrdude_arguments(&self) -> Vec<String> {
        let upload = &self.resolver.config().upload;
        let ide = self.resolver.paths().ide.as_ref();

        let mut args = vec![
            format!("-C{}", dir_arg(ide, "hardware/tools/avr/etc/avrdude.conf")),
            format!("-p{}", upload.partno),
            format!("-c{}", upload.programmer),
            format!("-P{}", upload.serial_port.as_deref().unwrap_or_default()),
            format!("-b{}", upload.baud_rate),
        ];
        args.extend(upload.options.iter().cloned());
        args.push(flash_directive(&self.sketch.artifact_path()));

        let platform = self.resolver.platform();
        args.iter().map(|a| platform.native_path(a)).collect()
    }

    /// Size report command, if the platform declares a size recipe.
    pub fn size_command(&self) -> Option<CommandSpec> {
        let pattern = self
            .resolver
            .expander(Some(self.sketch))
            .expand("recipe.size.pattern");
        let mut tokens = split_args(&pattern).into_iter();
        let program = tokens.next()?;
        Some(recipe_command(self.resolver.platform(), &program, tokens))
    }
}

/// Command built from expanded recipe tokens, every token in host form.
fn recipe_command(
    platform: HostPlatform,
    program: &str,
    args: impl IntoIterator<Item = String>,
) -> CommandSpec {
    CommandSpec::new(platform.native_path(program))
        .args(args.into_iter().map(|a| platform.native_path(&a)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prefs::PreferenceStore;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        ide: PathBuf,
        root: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let ide = tmp.path().join("arduino");
        let root = tmp.path().join("work");
        std::fs::create_dir_all(&ide).unwrap();
        std::fs::create_dir_all(&root).unwrap();
        Fixture { _tmp: tmp, ide, root }
    }

    fn config(fx: &Fixture) -> Config {
        let mut config = Config::default();
        config.toolchain.ide_path = Some(fx.ide.clone());
        config.toolchain.library_path = Some(PathBuf::from("/home/me/Arduino/libraries"));
        config.toolchain.package_path = Some(PathBuf::from("/home/me/.arduino15"));
        config.upload.serial_port = Some("/dev/ttyACM0".to_string());
        config
    }

    fn resolver(fx: &Fixture, config: Config, prefs: PreferenceStore) -> RecipeResolver {
        RecipeResolver::with_preferences(config, HostPlatform::Linux, &fx.root, prefs)
    }

    fn sketch(fx: &Fixture) -> Sketch {
        Sketch::resolve(&fx.root.join("blink.ino"), &fx.root, None)
    }

    #[test]
    fn test_build_arguments_shape() {
        let fx = fixture();
        let mut cfg = config(&fx);
        cfg.build.compile_options = vec!["-jobs".to_string(), "2".to_string()];
        let r = resolver(&fx, cfg, PreferenceStore::new());
        let s = sketch(&fx);
        let args = ArgumentSynthesizer::new(&r, &s).build_arguments();
        let ide = fx.ide.display().to_string();

        assert_eq!(&args[..2], &["-logger", "machine"]);
        assert_eq!(args[3], format!("{}/hardware", ide));
        assert_eq!(args[5], "/home/me/.arduino15/packages");
        assert!(args.contains(&"-fqbn=arduino:avr:uno".to_string()));
        assert!(args.contains(&"-warnings=none".to_string()));
        assert!(args.contains(&"-prefs=build.warn_data_percentage=75".to_string()));
        assert!(args.contains(&format!("-prefs=runtime.tools.avrdude.path={}/hardware/tools/avr", ide)));

        let build_path = args.iter().position(|a| a == "-build-path").unwrap();
        assert_eq!(args[build_path + 1], s.build_dir().display().to_string());

        let jobs = args.iter().position(|a| a == "-jobs").unwrap();
        assert_eq!(args[jobs + 1], "2");
        assert_eq!(args.last().unwrap(), &s.path().display().to_string());
    }

    #[test]
    fn test_verbose_build_arguments() {
        let fx = fixture();
        let mut cfg = config(&fx);
        cfg.build.verbose = true;
        let r = resolver(&fx, cfg, PreferenceStore::new());
        let s = sketch(&fx);
        let args = ArgumentSynthesizer::new(&r, &s).build_arguments();

        assert_eq!(args[1], "human");
        assert_eq!(args[args.len() - 2], "-verbose");
        assert!(args.last().unwrap().ends_with("blink.ino"));
    }

    #[test]
    fn test_windows_paths_use_backslashes() {
        let fx = fixture();
        let r = RecipeResolver::with_preferences(
            config(&fx),
            HostPlatform::Windows,
            &fx.root,
            PreferenceStore::new(),
        );
        let s = Sketch::resolve(Path::new("C:/work/blink.ino"), Path::new("C:/work"), None);
        let args = ArgumentSynthesizer::new(&r, &s).build_arguments();

        assert_eq!(args.last().unwrap(), "C:\\work\\blink.ino");
        assert!(args.contains(&"-fqbn=arduino:avr:uno".to_string()));
    }

    #[test]
    fn test_platform_upload_drops_executable() {
        let fx = fixture();
        let prefs: PreferenceStore = [
            ("upload.tool", "avrdude"),
            ("tools.avrdude.path", "/opt/avr"),
            ("tools.avrdude.cmd.path", "{path}/bin/avrdude"),
            (
                "tools.avrdude.upload.pattern",
                "\"{cmd.path}\" -v \"-P{serial.port}\" \"-Uflash:w:{build.path}/{build.project_name}.hex:i\"",
            ),
        ]
        .into_iter()
        .collect();
        let r = resolver(&fx, config(&fx), prefs);
        let s = sketch(&fx);
        let synth = ArgumentSynthesizer::new(&r, &s);

        assert_eq!(
            synth.upload_strategy(),
            UploadStrategy::Platform {
                tool: "avrdude".to_string(),
                program: "/opt/avr/bin/avrdude".to_string()
            }
        );
        let cmd = synth.upload_command();
        assert_eq!(cmd.program, PathBuf::from("/opt/avr/bin/avrdude"));
        assert_eq!(
            cmd.args,
            vec![
                "-v".to_string(),
                "-P/dev/ttyACM0".to_string(),
                format!("-Uflash:w:{}:i", s.artifact_path().display()),
            ]
        );
    }

    #[test]
    fn test_avrdude_fallback() {
        let fx = fixture();
        let mut cfg = config(&fx);
        cfg.upload.options = vec!["-D".to_string()];
        let r = resolver(&fx, cfg, PreferenceStore::new());
        let s = sketch(&fx);
        let synth = ArgumentSynthesizer::new(&r, &s);
        let ide = fx.ide.display().to_string();

        assert_eq!(synth.upload_strategy(), UploadStrategy::Avrdude);
        let cmd = synth.upload_command();
        assert_eq!(
            cmd.program,
            PathBuf::from(format!("{}/hardware/tools/avr/bin/avrdude", ide))
        );
        assert_eq!(
            cmd.args,
            vec![
                format!("-C{}/hardware/tools/avr/etc/avrdude.conf", ide),
                "-patmega328p".to_string(),
                "-carduino".to_string(),
                "-P/dev/ttyACM0".to_string(),
                "-b115200".to_string(),
                "-D".to_string(),
                format!("-Uflash:w:{}:i", s.artifact_path().display()),
            ]
        );
    }

    #[test]
    fn test_custom_uploader_substitution() {
        let fx = fixture();
        let uploader = fx.root.join("flash-tool");
        std::fs::write(&uploader, "").unwrap();

        let mut cfg = config(&fx);
        cfg.upload.uploader = Some(uploader.clone());
        cfg.upload.baud_rate = 57_600;
        cfg.upload.options = vec![
            "--port=$SERIALPORT".to_string(),
            "--baud=$BAUDRATE".to_string(),
            "--image=$TARGET".to_string(),
        ];
        let r = resolver(&fx, cfg, PreferenceStore::new());
        let s = sketch(&fx);
        let synth = ArgumentSynthesizer::new(&r, &s);

        assert_eq!(synth.upload_strategy(), UploadStrategy::Custom(uploader));
        assert_eq!(
            synth.upload_arguments(),
            vec![
                "--port=/dev/ttyACM0".to_string(),
                "--baud=57600".to_string(),
                format!("--image={}", s.artifact_path().display()),
            ]
        );
    }

    #[test]
    fn test_custom_uploader_without_target_gets_flash_directive() {
        let fx = fixture();
        let uploader = fx.root.join("flash-tool");
        std::fs::write(&uploader, "").unwrap();

        let mut cfg = config(&fx);
        cfg.upload.uploader = Some(uploader);
        cfg.upload.options = vec!["-P$SERIALPORT".to_string()];
        let r = resolver(&fx, cfg, PreferenceStore::new());
        let s = sketch(&fx);
        let args = ArgumentSynthesizer::new(&r, &s).upload_arguments();

        assert_eq!(args[0], "-P/dev/ttyACM0");
        assert_eq!(args[1], format!("-Uflash:w:{}:i", s.artifact_path().display()));
    }

    #[test]
    fn test_size_command() {
        let fx = fixture();
        let prefs: PreferenceStore = [
            ("compiler.path", "/opt/avr/bin/"),
            ("compiler.size.cmd", "avr-size"),
            (
                "recipe.size.pattern",
                "\"{compiler.path}{compiler.size.cmd}\" -A \"{build.path}/{build.project_name}.elf\"",
            ),
        ]
        .into_iter()
        .collect();
        let r = resolver(&fx, config(&fx), prefs);
        let s = sketch(&fx);
        let cmd = ArgumentSynthesizer::new(&r, &s).size_command().unwrap();

        assert_eq!(cmd.program, PathBuf::from("/opt/avr/bin/avr-size"));
        assert_eq!(
            cmd.args,
            vec!["-A".to_string(), format!("{}/blink.ino.elf", s.build_dir().display())]
        );
    }

    #[test]
    fn test_recipe_tokens_use_host_paths() {
        let fx = fixture();
        let prefs: PreferenceStore = [
            ("upload.tool", "avrdude"),
            ("tools.avrdude.cmd.path", "C:/avr/bin/avrdude"),
            ("tools.avrdude.upload.pattern", "\"{cmd.path}\" \"-CC:/avr/etc/avrdude.conf\""),
            ("compiler.path", "C:/avr/bin/"),
            ("compiler.size.cmd", "avr-size"),
            ("recipe.size.pattern", "\"{compiler.path}{compiler.size.cmd}\" -A \"{build.path}/x.elf\""),
        ]
        .into_iter()
        .collect();
        let r = RecipeResolver::with_preferences(config(&fx), HostPlatform::Windows, &fx.root, prefs);
        let s = Sketch::resolve(Path::new("C:/work/blink.ino"), Path::new("C:/work"), None);
        let synth = ArgumentSynthesizer::new(&r, &s);

        let upload = synth.upload_command();
        assert_eq!(upload.program, PathBuf::from("C:\\avr\\bin\\avrdude.exe"));
        assert_eq!(upload.args, vec!["-CC:\\avr\\etc\\avrdude.conf".to_string()]);

        let size = synth.size_command().unwrap();
        assert_eq!(size.program, PathBuf::from("C:\\avr\\bin\\avr-size.exe"));
        assert_eq!(
            size.args,
            vec!["-A".to_string(), "C:\\work\\.build\\blink\\x.elf".to_string()]
        );
    }

    #[test]
    fn test_size_command_absent() {
        let fx = fixture();
        let r = resolver(&fx, config(&fx), PreferenceStore::new());
        let s = sketch(&fx);
        assert!(ArgumentSynthesizer::new(&r, &s).size_command().is_none());
    }

    #[test]
    fn test_command_display_quotes_spaces() {
        let cmd = CommandSpec::new("avrdude").arg("-P/dev/ttyACM0").arg("C:/Program Files/x");
        assert_eq!(cmd.to_string(), "avrdude -P/dev/ttyACM0 \"C:/Program Files/x\"");
    }
}
