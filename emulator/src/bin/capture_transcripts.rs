use std::io;

#[allow(dead_code)]
#[path = "../command.rs"]
mod command;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;
#[allow(dead_code)]
#[path = "../sim.rs"]
mod sim;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Usb)?;
    record_profile(TranscriptProfile::Jig)?;
    record_profile(TranscriptProfile::Debounce)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(profile)?;
    let script: &[&str] = match profile {
        TranscriptProfile::Usb => &[
            "help",
            "plug usb-sdp",
            "status",
            "path usb cp",
            "status",
            "path usb ap",
            "unplug",
            "plug usb-cdp",
            "plug ta",
            "fault ovp",
            "unplug",
            "plug otg",
            "unplug",
        ],
        TranscriptProfile::Jig => &[
            "plug jig-uart-off",
            "status",
            "plug jig-uart-off vbus",
            "unplug",
            "plug jig-usb-on",
            "unplug",
            "path uart cp",
            "plug uart",
            "status",
            "unplug",
            "plug desk-dock",
            "unplug",
        ],
        TranscriptProfile::Debounce => &[
            "dcd 3",
            "plug ta",
            "status",
            "unplug",
            "dcd 60",
            "plug usb-sdp",
            "status",
            "unplug",
            "por",
            "status",
        ],
    };

    for line in script {
        let _ = session.handle_command(line)?;
    }
    Ok(())
}
