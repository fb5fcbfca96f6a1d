//! Per-PD session state: the control byte / sequence counter, the pending
//! command queue, the liveness timer, and ownership of the Secure Channel.
//! `next_command` implements the handshake-before-user-traffic priority from
//! spec §4.3.

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::codec::ControlByte;
use crate::command::Command;
use crate::constants::LIVENESS_WINDOW_MS;
use crate::secure_channel::SecureChannel;

/// The per-send control byte plus the sequence counter that drives it.
/// Mirrors `osdp-python`'s `Control`: sequence walks 0→1→2→3→1… and never
/// returns to 0 once bootstrapped.
#[derive(Debug, Clone, Copy)]
pub struct ControlState {
    pub sequence: u8,
    pub use_crc: bool,
    pub has_scb: bool,
}

impl ControlState {
    pub fn new(use_crc: bool, has_scb: bool) -> Self {
        Self {
            sequence: 0,
            use_crc,
            has_scb,
        }
    }

    pub fn to_control_byte(self) -> ControlByte {
        ControlByte {
            sequence: self.sequence & 0x03,
            use_crc: self.use_crc,
            has_scb: self.has_scb,
        }
    }

    /// `sequence % 3 + 1`, the authoritative formula per spec §9 (the
    /// alternate `(sequence + 1) % 3 + 1` reading of the source is rejected).
    pub fn increment_sequence(&mut self) {
        self.sequence = self.sequence % 3 + 1;
    }
}

pub struct Device {
    pub address: u8,
    pub use_scs: bool,
    pub message_control: ControlState,
    pending_tx: mpsc::UnboundedSender<Command>,
    pending_rx: mpsc::UnboundedReceiver<Command>,
    last_valid_reply: Option<Instant>,
    secure_channel: SecureChannel,
}

impl Device {
    pub fn new(address: u8, use_crc: bool, use_scs: bool) -> Self {
        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        Self {
            address,
            use_scs,
            message_control: ControlState::new(use_crc, use_scs),
            pending_tx,
            pending_rx,
            last_valid_reply: None,
            secure_channel: SecureChannel::with_default_key(),
        }
    }

    pub fn with_scbk(address: u8, use_crc: bool, use_scs: bool, scbk: [u8; 16]) -> Self {
        let mut device = Self::new(address, use_crc, use_scs);
        device.secure_channel = SecureChannel::new(scbk);
        device
    }

    pub fn control_byte(&self) -> ControlByte {
        self.message_control.to_control_byte()
    }

    pub fn secure_channel(&self) -> &SecureChannel {
        &self.secure_channel
    }

    pub fn secure_channel_mut(&mut self) -> &mut SecureChannel {
        &mut self.secure_channel
    }

    pub fn is_security_established(&self) -> bool {
        self.message_control.has_scb && self.secure_channel.is_established()
    }

    pub fn is_online(&self) -> bool {
        match self.last_valid_reply {
            Some(t) => t.elapsed() <= Duration::from_millis(LIVENESS_WINDOW_MS),
            None => false,
        }
    }

    /// Queues a user command for this device's next available send slot.
    pub fn enqueue(&self, command: Command) {
        // An unbounded channel only fails to send if the receiver (this same
        // Device) has been dropped, which can't happen while `self` exists.
        let _ = self.pending_tx.send(command);
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<Command> {
        self.pending_tx.clone()
    }

    /// Picks the next command to send, per spec §4.3's priority order:
    /// bootstrap POLL, then secure-channel handshake steps, then the user
    /// queue, falling back to a keep-alive POLL.
    pub fn next_command(&mut self) -> Command {
        if self.message_control.sequence == 0 {
            return Command::Poll {
                address: self.address,
            };
        }

        if self.use_scs && !self.secure_channel.is_initialized() {
            return Command::SecurityInitializationRequest {
                address: self.address,
                server_random: self.secure_channel.server_random(),
            };
        }

        if self.use_scs && !self.secure_channel.is_established() {
            return Command::ServerCryptogram {
                address: self.address,
                server_cryptogram: self.secure_channel.server_cryptogram(),
            };
        }

        match self.pending_rx.try_recv() {
            Ok(command) => command,
            Err(_) => Command::Poll {
                address: self.address,
            },
        }
    }

    /// Called on every structurally valid, address-matching reply whose
    /// type is not `Busy`: advances sequence and refreshes liveness.
    pub fn on_valid_reply(&mut self) {
        self.message_control.increment_sequence();
        self.last_valid_reply = Some(Instant::now());
    }

    /// Drops back to an un-handshaken Secure Channel; the device re-enters
    /// the handshake on its next `next_command` call.
    pub fn reset_security(&mut self) {
        self.secure_channel.reset();
    }

    pub fn initialize_secure_channel(
        &mut self,
        client_random: [u8; 8],
        client_cryptogram: [u8; 16],
    ) -> Result<(), crate::error::OsdpError> {
        self.secure_channel.initialize(client_random, client_cryptogram)
    }

    pub fn establish_secure_channel(&mut self, r_mac0: [u8; 16]) {
        self.secure_channel.establish(r_mac0);
    }

    /// Computes the rolling MAC over `message` as either a command or a
    /// reply MAC, advancing the chain (see [`SecureChannel::generate_mac`]).
    pub fn generate_mac(&mut self, message: &[u8], is_command: bool) -> [u8; 16] {
        self.secure_channel.generate_mac(message, is_command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_device_starts_at_sequence_zero_and_offline() {
        let device = Device::new(0x01, false, false);
        assert_eq!(device.message_control.sequence, 0);
        assert!(!device.is_online());
    }

    #[test]
    fn sequence_walks_one_two_three_one() {
        let mut control = ControlState::new(false, false);
        let mut seen = Vec::new();
        for _ in 0..5 {
            control.increment_sequence();
            seen.push(control.sequence);
        }
        assert_eq!(seen, vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn next_command_is_poll_at_sequence_zero() {
        let mut device = Device::new(0x01, false, true);
        assert!(matches!(device.next_command(), Command::Poll { .. }));
    }

    #[test]
    fn next_command_drives_handshake_before_user_queue() {
        let mut device = Device::new(0x01, false, true);
        device.enqueue(Command::IdReport { address: 0x01 });
        device.message_control.sequence = 1;

        assert!(matches!(
            device.next_command(),
            Command::SecurityInitializationRequest { .. }
        ));

        let server_random = device.secure_channel().server_random();
        let enc = crate::secure_channel::generate_key(
            &crate::secure_channel::prefixed_random(0x01, 0x82, &server_random),
            &[0u8; 8],
            &crate::constants::DEFAULT_SCBK,
        );
        let client_random = [0x11u8; 8];
        let client_cryptogram =
            crate::secure_channel::generate_key(&server_random, &client_random, &enc);
        device
            .initialize_secure_channel(client_random, client_cryptogram)
            .unwrap();

        assert!(matches!(
            device.next_command(),
            Command::ServerCryptogram { .. }
        ));

        device.establish_secure_channel([0u8; 16]);

        assert!(matches!(device.next_command(), Command::IdReport { .. }));
    }

    #[test]
    fn next_command_falls_back_to_poll_keepalive_when_queue_empty() {
        let mut device = Device::new(0x01, false, false);
        device.message_control.sequence = 1;
        assert!(matches!(device.next_command(), Command::Poll { .. }));
    }
}
