//! OSDP v2 Secure Channel Session: AES-128 ECB key derivation, a CBC-MAC
//! variant chained across the command/reply stream, and AES-128 CBC payload
//! encryption.
//!
//! The MAC and payload IVs cross-reference the *other* stream's rolling
//! state (a command MAC is seeded from the previous reply MAC and vice
//! versa), which is what keeps the whole exchange — not just one direction —
//! chained together; see `generate_mac` below.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{AES_BLOCK_SIZE, DEFAULT_SCBK};
use crate::error::OsdpError;

const PADDING_SENTINEL: u8 = 0x80;

/// Lifecycle of a Device's Secure Channel Session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureChannelState {
    /// No handshake in progress; `server_random` has just been (re)seeded.
    Seeded,
    /// Client cryptogram verified, session keys derived.
    Initialized,
    /// PD has accepted the server cryptogram; MAC/encryption are live.
    Established,
}

/// AES-128-keyed CBC-MAC/CBC-encryption state for one Device's secure
/// session. Key material zeroes itself on drop.
#[derive(ZeroizeOnDrop)]
pub struct SecureChannel {
    scbk: [u8; 16],
    #[zeroize(skip)]
    state: SecureChannelState,
    server_random: [u8; 8],
    server_cryptogram: [u8; 16],
    enc: [u8; 16],
    smac1: [u8; 16],
    smac2: [u8; 16],
    cmac: [u8; 16],
    rmac: [u8; 16],
}

impl SecureChannel {
    /// Creates a freshly seeded channel using `scbk` as the Secure Channel
    /// Base Key (callers that don't have a provisioned key should pass
    /// [`crate::constants::DEFAULT_SCBK`]).
    pub fn new(scbk: [u8; 16]) -> Self {
        let mut channel = Self {
            scbk,
            state: SecureChannelState::Seeded,
            server_random: [0u8; 8],
            server_cryptogram: [0u8; 16],
            enc: [0u8; 16],
            smac1: [0u8; 16],
            smac2: [0u8; 16],
            cmac: [0u8; 16],
            rmac: [0u8; 16],
        };
        channel.reset();
        channel
    }

    pub fn with_default_key() -> Self {
        Self::new(DEFAULT_SCBK)
    }

    pub fn state(&self) -> SecureChannelState {
        self.state
    }

    pub fn is_initialized(&self) -> bool {
        self.state != SecureChannelState::Seeded
    }

    pub fn is_established(&self) -> bool {
        self.state == SecureChannelState::Established
    }

    pub fn server_random(&self) -> [u8; 8] {
        self.server_random
    }

    pub fn server_cryptogram(&self) -> [u8; 16] {
        self.server_cryptogram
    }

    /// Re-seeds `server_random` and drops back to `Seeded`. Called on
    /// construction and on any security failure (MAC mismatch, rejected
    /// cryptogram, PD Nak indicating it doesn't support/require security).
    pub fn reset(&mut self) {
        rand::thread_rng().fill_bytes(&mut self.server_random);
        self.enc.zeroize();
        self.smac1.zeroize();
        self.smac2.zeroize();
        self.cmac.zeroize();
        self.rmac.zeroize();
        self.state = SecureChannelState::Seeded;
    }

    /// Derives session keys from the PD's `CrypticData` reply and verifies
    /// the client cryptogram it carries.
    pub fn initialize(
        &mut self,
        client_random: [u8; 8],
        client_cryptogram: [u8; 16],
    ) -> Result<(), OsdpError> {
        self.enc = generate_key(
            &prefixed_random(0x01, 0x82, &self.server_random),
            &[0u8; 8],
            &self.scbk,
        );

        let expected = generate_key(&self.server_random, &client_random, &self.enc);
        if client_cryptogram != expected {
            return Err(OsdpError::BadClientCryptogram);
        }

        self.smac1 = generate_key(
            &prefixed_random(0x01, 0x01, &self.server_random),
            &[0u8; 8],
            &self.scbk,
        );
        self.smac2 = generate_key(
            &prefixed_random(0x01, 0x02, &self.server_random),
            &[0u8; 8],
            &self.scbk,
        );
        self.server_cryptogram = generate_key(&client_random, &self.server_random, &self.enc);
        self.state = SecureChannelState::Initialized;
        Ok(())
    }

    /// Accepts the PD's initial reply MAC, completing the handshake.
    pub fn establish(&mut self, r_mac0: [u8; 16]) {
        self.rmac = r_mac0;
        self.state = SecureChannelState::Established;
    }

    /// Computes the rolling CBC-MAC over `message` and advances the chain.
    ///
    /// The IV is seeded from the *other* stream's current MAC: a command MAC
    /// starts from `R_MAC`, a reply MAC starts from `C_MAC`; the result then
    /// replaces the MAC of the stream being generated. This cross-reference
    /// is what keeps command and reply MACs chained to each other across the
    /// whole session rather than each chaining only to itself.
    pub fn generate_mac(&mut self, message: &[u8], is_command: bool) -> [u8; 16] {
        let mut iv = if is_command { self.rmac } else { self.cmac };
        let mut mac = [0u8; 16];

        // An empty message never enters the block loop below, so (matching
        // the reference implementation) its MAC is sixteen zero bytes rather
        // than an encrypted block.
        let mut offset = 0;
        if !message.is_empty() {
            while offset < message.len() {
                let remaining = message.len() - offset;
                let is_last_block = remaining <= AES_BLOCK_SIZE;
                let key = if is_last_block { &self.smac2 } else { &self.smac1 };

                let mut block = [0u8; 16];
                let take = remaining.min(AES_BLOCK_SIZE);
                block[..take].copy_from_slice(&message[offset..offset + take]);
                if is_last_block && take < AES_BLOCK_SIZE {
                    block[take] = PADDING_SENTINEL;
                }
                for (b, i) in block.iter_mut().zip(iv.iter()) {
                    *b ^= i;
                }

                let cipher = Aes128::new(GenericArray::from_slice(key));
                let mut ga = GenericArray::clone_from_slice(&block);
                cipher.encrypt_block(&mut ga);
                mac.copy_from_slice(&ga);
                iv = mac;

                offset += AES_BLOCK_SIZE;
            }
        }

        if is_command {
            self.cmac = mac;
        } else {
            self.rmac = mac;
        }
        mac
    }

    /// Encrypts a command payload: pad with `0x80` then zeros to a 16-byte
    /// boundary, AES-128-CBC encrypt under `enc` with IV = `!R_MAC`.
    pub fn encrypt_data(&self, data: &[u8]) -> Vec<u8> {
        let padded = pad(data);
        let iv = bitwise_not(&self.rmac);
        cbc_encrypt(&self.enc, &iv, &padded)
    }

    /// Decrypts a reply payload under IV = `!C_MAC`, stripping the trailing
    /// zero-pad and the `0x80` sentinel.
    pub fn decrypt_data(&self, data: &[u8]) -> Vec<u8> {
        let iv = bitwise_not(&self.cmac);
        let padded = cbc_decrypt(&self.enc, &iv, data);
        unpad(&padded)
    }
}

pub fn prefixed_random(b0: u8, b1: u8, random: &[u8; 8]) -> [u8; 8] {
    [b0, b1, random[0], random[1], random[2], random[3], random[4], random[5]]
}

pub fn generate_key(first: &[u8], second: &[u8], key: &[u8; 16]) -> [u8; 16] {
    let mut block = [0u8; 16];
    block[..first.len()].copy_from_slice(first);
    block[first.len()..first.len() + second.len()].copy_from_slice(second);

    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut ga = GenericArray::clone_from_slice(&block);
    cipher.encrypt_block(&mut ga);
    let mut out = [0u8; 16];
    out.copy_from_slice(&ga);
    out
}

fn cbc_encrypt(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut prev = *iv;
    let mut out = Vec::with_capacity(data.len());
    for chunk in data.chunks(AES_BLOCK_SIZE) {
        let mut block = [0u8; 16];
        block[..chunk.len()].copy_from_slice(chunk);
        for (b, p) in block.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        let mut ga = GenericArray::clone_from_slice(&block);
        cipher.encrypt_block(&mut ga);
        out.extend_from_slice(&ga);
        prev.copy_from_slice(&ga);
    }
    out
}

fn cbc_decrypt(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Vec<u8> {
    let cipher = Aes128::new(GenericArray::from_slice(key));
    let mut prev = *iv;
    let mut out = Vec::with_capacity(data.len());
    for chunk in data.chunks(AES_BLOCK_SIZE) {
        let mut ga = GenericArray::clone_from_slice(chunk);
        let cipher_block = ga.clone();
        cipher.decrypt_block(&mut ga);
        for (b, p) in ga.iter_mut().zip(prev.iter()) {
            *b ^= p;
        }
        out.extend_from_slice(&ga);
        prev.copy_from_slice(&cipher_block);
    }
    out
}

fn bitwise_not(bytes: &[u8; 16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (o, b) in out.iter_mut().zip(bytes.iter()) {
        *o = !b;
    }
    out
}

fn pad(data: &[u8]) -> Vec<u8> {
    let mut padded = data.to_vec();
    padded.push(PADDING_SENTINEL);
    while padded.len() % AES_BLOCK_SIZE != 0 {
        padded.push(0x00);
    }
    padded
}

fn unpad(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    while out.last() == Some(&0x00) {
        out.pop();
    }
    if out.last() == Some(&PADDING_SENTINEL) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_channel_is_seeded_not_initialized() {
        let channel = SecureChannel::with_default_key();
        assert_eq!(channel.state(), SecureChannelState::Seeded);
        assert!(!channel.is_initialized());
        assert!(!channel.is_established());
    }

    #[test]
    fn initialize_rejects_bad_client_cryptogram() {
        let mut channel = SecureChannel::with_default_key();
        let result = channel.initialize([0u8; 8], [0u8; 16]);
        assert!(matches!(result, Err(OsdpError::BadClientCryptogram)));
        assert!(!channel.is_initialized());
    }

    #[test]
    fn initialize_then_establish_reaches_established_state() {
        let mut channel = SecureChannel::with_default_key();
        let client_random = [0x11u8; 8];
        let server_random = channel.server_random();

        // Compute the client cryptogram the way a PD would, reusing the
        // module's own key-derivation primitive as the reference oracle.
        let enc = generate_key(
            &prefixed_random(0x01, 0x82, &server_random),
            &[0u8; 8],
            &DEFAULT_SCBK,
        );
        let client_cryptogram = generate_key(&server_random, &client_random, &enc);

        channel.initialize(client_random, client_cryptogram).unwrap();
        assert!(channel.is_initialized());
        assert!(!channel.is_established());

        channel.establish([0x22u8; 16]);
        assert!(channel.is_established());
    }

    #[test]
    fn encrypt_decrypt_round_trip_various_lengths() {
        for len in [0usize, 1, 15, 16, 17, 31, 32] {
            let mut channel = SecureChannel::with_default_key();
            channel.rmac = [0x5Au8; 16];
            channel.cmac = channel.rmac;
            channel.enc = [0xA5u8; 16];

            let data: Vec<u8> = (0..len as u8).collect();
            let encrypted = channel.encrypt_data(&data);

            // decrypt_data uses !cmac as IV; mirror encrypt's use of !rmac
            // by aligning cmac to rmac for this self-contained round trip.
            let decrypted = channel.decrypt_data(&encrypted);
            assert_eq!(decrypted, data);
        }
    }

    #[test]
    fn generate_mac_is_deterministic_given_fixed_chain_state() {
        let mut a = SecureChannel::with_default_key();
        let mut b = SecureChannel::with_default_key();
        a.smac1 = [0x01u8; 16];
        a.smac2 = [0x02u8; 16];
        a.rmac = [0x03u8; 16];
        b.smac1 = a.smac1;
        b.smac2 = a.smac2;
        b.rmac = a.rmac;

        let m1 = a.generate_mac(b"hello world this is 17", true);
        let m2 = b.generate_mac(b"hello world this is 17", true);
        assert_eq!(m1, m2);
        assert_eq!(a.cmac, b.cmac);
    }
}
