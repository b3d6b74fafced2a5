use anyhow::Context;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    cmini_drv::init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match cmini_drv::parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match cmini_drv::compile(&config) {
        Ok(asm) => match write_stdout(&asm) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprint!("{}", e.render(&config.source));
            ExitCode::FAILURE
        }
    }
}

fn write_stdout(asm: &str) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    out.write_all(asm.as_bytes())
        .context("failed to write emitted assembly to stdout")?;
    out.flush().context("failed to flush stdout")
}
