//! Emulator command grammar.
//!
//! Lines are parsed with `winnow` straight off the input string. Keywords and
//! arguments are lowercase words separated by whitespace.

use muic_core::{CableType, ProcessorPath};
use winnow::ModalResult;
use winnow::ascii::space1;
use winnow::combinator::{cut_err, fail, opt, preceded};
use winnow::error::{ContextError, ParseError, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::take_while;

/// Interrupt-flag fault the operator can inject.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultKind {
    OverVoltage,
    OverCurrent,
    OverTemperature,
}

impl FaultKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ovp" => Some(Self::OverVoltage),
            "ocp" => Some(Self::OverCurrent),
            "otp" => Some(Self::OverTemperature),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::OverVoltage => "ovp",
            Self::OverCurrent => "ocp",
            Self::OverTemperature => "otp",
        }
    }
}

/// Which mux preference a `path` command changes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PathTarget {
    Usb,
    Uart,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    /// `vbus` overrides whether the cable supplies power.
    Plug {
        cable: CableType,
        vbus: Option<bool>,
    },
    Unplug,
    Fault(FaultKind),
    Dcd(u8),
    Por,
    Path {
        target: PathTarget,
        path: ProcessorPath,
    },
    Status,
    Help(Option<&'a str>),
    Exit,
}

/// Parses one command line.
pub fn parse(line: &str) -> Result<Command<'_>, ParseError<&str, ContextError>> {
    command.parse(line.trim())
}

/// Finds the cable whose label is `word`.
pub fn cable_from_label(word: &str) -> Option<CableType> {
    CableType::ALL
        .iter()
        .copied()
        .find(|cable| cable.label() == word)
}

fn command<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    let keyword = word.parse_next(input)?;
    match keyword {
        "plug" => plug(input),
        "unplug" => Ok(Command::Unplug),
        "fault" => fault(input),
        "dcd" => dcd(input),
        "por" => Ok(Command::Por),
        "path" => path(input),
        "status" => Ok(Command::Status),
        "help" => help(input),
        "exit" | "quit" => Ok(Command::Exit),
        _ => fail
            .context(StrContext::Expected(StrContextValue::Description(
                "command keyword",
            )))
            .parse_next(input),
    }
}

fn word<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-').parse_next(input)
}

fn argument<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    preceded(space1, word).parse_next(input)
}

fn plug<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    let cable = cut_err(argument.verify_map(cable_from_label))
        .context(StrContext::Expected(StrContextValue::Description(
            "cable name",
        )))
        .parse_next(input)?;
    let vbus = opt(argument.verify_map(|word| match word {
        "vbus" => Some(true),
        "novbus" => Some(false),
        _ => None,
    }))
    .parse_next(input)?;
    Ok(Command::Plug { cable, vbus })
}

fn fault<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    cut_err(argument.verify_map(FaultKind::from_tag))
        .context(StrContext::Expected(StrContextValue::Description(
            "ovp, ocp, or otp",
        )))
        .map(Command::Fault)
        .parse_next(input)
}

fn dcd<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    cut_err(argument.verify_map(|word| word.parse::<u8>().ok()))
        .context(StrContext::Expected(StrContextValue::Description(
            "read count 0-255",
        )))
        .map(Command::Dcd)
        .parse_next(input)
}

fn path<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    let target = cut_err(argument.verify_map(|word| match word {
        "usb" => Some(PathTarget::Usb),
        "uart" => Some(PathTarget::Uart),
        _ => None,
    }))
    .context(StrContext::Expected(StrContextValue::Description(
        "usb or uart",
    )))
    .parse_next(input)?;
    let path = cut_err(argument.verify_map(|word| match word {
        "ap" => Some(ProcessorPath::Ap),
        "cp" => Some(ProcessorPath::Cp),
        _ => None,
    }))
    .context(StrContext::Expected(StrContextValue::Description("ap or cp")))
    .parse_next(input)?;
    Ok(Command::Path { target, path })
}

fn help<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    opt(argument).map(Command::Help).parse_next(input)
}

#[cfg(test)]
mod tests {
    use muic_core::UsbPort;

    use super::*;

    #[test]
    fn plug_accepts_every_cable_label() {
        for cable in CableType::ALL {
            let line = format!("plug {}", cable.label());
            assert_eq!(
                parse(&line).ok(),
                Some(Command::Plug { cable, vbus: None }),
                "{line}"
            );
        }
    }

    #[test]
    fn plug_takes_vbus_override() {
        assert_eq!(
            parse("plug jig-uart-off vbus").ok(),
            Some(Command::Plug {
                cable: CableType::JigUartOff,
                vbus: Some(true),
            })
        );
        assert_eq!(
            parse("  plug usb-sdp   novbus ").ok(),
            Some(Command::Plug {
                cable: CableType::Usb(UsbPort::Sdp),
                vbus: Some(false),
            })
        );
    }

    #[test]
    fn plug_rejects_unknown_cable() {
        assert!(parse("plug toaster").is_err());
        assert!(parse("plug").is_err());
        assert!(parse("plug ta sideways").is_err());
    }

    #[test]
    fn parses_argument_commands() {
        assert_eq!(parse("fault ovp").ok(), Some(Command::Fault(FaultKind::OverVoltage)));
        assert_eq!(parse("fault otp").ok(), Some(Command::Fault(FaultKind::OverTemperature)));
        assert_eq!(parse("dcd 60").ok(), Some(Command::Dcd(60)));
        assert_eq!(
            parse("path uart cp").ok(),
            Some(Command::Path {
                target: PathTarget::Uart,
                path: ProcessorPath::Cp,
            })
        );
        assert_eq!(parse("help plug").ok(), Some(Command::Help(Some("plug"))));
        assert_eq!(parse("help").ok(), Some(Command::Help(None)));
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse("unplug").ok(), Some(Command::Unplug));
        assert_eq!(parse("por").ok(), Some(Command::Por));
        assert_eq!(parse("status").ok(), Some(Command::Status));
        assert_eq!(parse("exit").ok(), Some(Command::Exit));
    }

    #[test]
    fn rejects_malformed_arguments() {
        assert!(parse("dcd 300").is_err());
        assert!(parse("fault hot").is_err());
        assert!(parse("path usb").is_err());
        assert!(parse("status now").is_err());
        assert!(parse("reboot").is_err());
    }
}
