mod command;
mod session;
mod sim;

use std::env;
use std::io::{self, BufRead, Write};
use std::process;

use session::{Session, TranscriptProfile};

struct Options {
    profile: TranscriptProfile,
    transcript: bool,
}

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!(
            "Usage: muic-emulator [--no-transcript] [--profile <usb|jig|debounce>] | muic-emulator <usb|jig|debounce>"
        );
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = if options.transcript {
        Session::new(options.profile)?
    } else {
        Session::detached()?
    };
    let mut line = String::new();

    writeln!(
        writer,
        "MUIC Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<Options, String> {
    let mut options = Options {
        profile: TranscriptProfile::Usb,
        transcript: true,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--no-transcript" {
            options.transcript = false;
        } else if let Some(value) = arg.strip_prefix("--profile=") {
            options.profile = TranscriptProfile::from_tag(value)?;
        } else if arg == "--profile" {
            let value = args
                .next()
                .ok_or_else(|| "Expected value after --profile".to_string())?;
            options.profile = TranscriptProfile::from_tag(&value)?;
        } else {
            options.profile = TranscriptProfile::from_tag(&arg)?;
        }
    }

    Ok(options)
}
