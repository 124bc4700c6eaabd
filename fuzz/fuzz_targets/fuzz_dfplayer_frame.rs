//! Fuzz target: DFPlayer reply parsing
//!
//! Feeds arbitrary bytes to `parse_frame`. Any frame it accepts must
//! re-encode to the same bytes when the command is one the driver sends.
//!
//! cargo fuzz run fuzz_dfplayer_frame

#![no_main]

use libfuzzer_sys::fuzz_target;
use doorbell::drivers::audio::{Command, encode_frame, parse_frame};

const COMMANDS: [Command; 5] = [
    Command::Play,
    Command::Volume,
    Command::Loop,
    Command::Stop,
    Command::QueryStatus,
];

fuzz_target!(|data: &[u8]| {
    let Some((cmd, param)) = parse_frame(data) else {
        return;
    };
    if let Some(&known) = COMMANDS.iter().find(|c| **c as u8 == cmd) {
        let frame = encode_frame(known, param);
        assert_eq!(parse_frame(&frame), Some((cmd, param)));
    }
});
