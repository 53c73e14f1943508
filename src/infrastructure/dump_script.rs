use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

use crate::infrastructure::mysqldump_template::{DumpCommand, single_quote};

/// Writes one command per line, nothing else.
pub fn write_command_lines<W: Write>(mut writer: W, commands: &[DumpCommand]) -> io::Result<()> {
    for command in commands {
        writeln!(writer, "{}", command.command_line)?;
    }
    writer.flush()
}

/// Writes a bash script that runs the dumps one after another and reports
/// each finished file.
pub fn write_bash_script<W: Write>(mut writer: W, commands: &[DumpCommand]) -> io::Result<()> {
    writeln!(writer, "#!/bin/bash")?;
    for (position, command) in commands.iter().enumerate() {
        if position > 0 {
            writeln!(writer, "sleep 1")?;
        }
        writeln!(writer, "{}", command.command_line)?;
        let notice = format!("dumped {}", command.output_file.display());
        writeln!(writer, "echo {}", single_quote(&notice))?;
    }
    writer.flush()
}

pub fn save_script(path: &Path, commands: &[DumpCommand]) -> Result<()> {
    let script_file = File::create(path)
        .with_context(|| format!("Unable to create script file: {}", path.display()))?;
    write_bash_script(BufWriter::new(script_file), commands)
        .with_context(|| format!("Unable to write script file: {}", path.display()))?;
    make_executable(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Unable to mark script executable: {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(path: &Path) -> Result<()> {
    fs::metadata(path)
        .map(|_| ())
        .with_context(|| format!("Unable to read script file: {}", path.display()))
}
