//! Fixtures for fake toolchains.

use std::path::{Path, PathBuf};

/// A trimmed preference dump of the AVR core, as `-dump-prefs` prints it.
pub const AVR_DUMP: &str = "\
runtime.ide.version=10800
upload.tool=avrdude
upload.protocol=arduino
upload.speed=115200
build.mcu=atmega328p
tools.avrdude.path={runtime.tools.avrdude.path}
tools.avrdude.cmd.path={path}/bin/avrdude
tools.avrdude.config.path={path}/etc/avrdude.conf
tools.avrdude.upload.params.verbose=-v
tools.avrdude.upload.params.quiet=-q -q
tools.avrdude.upload.pattern=\"{cmd.path}\" \"-C{config.path}\" {upload.verbose} -p{build.mcu} -c{upload.protocol} \"-P{serial.port}\" -b{upload.speed} -D \"-Uflash:w:{build.path}/{build.project_name}.hex:i\"
runtime.tools.avrdude.path=/opt/arduino/hardware/tools/avr
compiler.path=/opt/arduino/hardware/tools/avr/bin/
compiler.size.cmd=avr-size
recipe.size.pattern=\"{compiler.path}{compiler.size.cmd}\" -A \"{build.path}/{build.project_name}.elf\"
";

/// Write an executable `/bin/sh` script into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}
