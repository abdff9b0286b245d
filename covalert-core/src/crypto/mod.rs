// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod encryption;
pub mod kdf;
pub mod mac;

pub use encryption::{
    decrypt, decrypt_bound, encrypt, encrypt_bound, EncryptionError, SymmetricKey,
};
pub use kdf::{KDFError, HKDF};
pub use mac::{MacKey, MacPrefix, MAC_SIZE};
