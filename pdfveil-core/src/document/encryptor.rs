//! Password protection for rebuilt documents.
//!
//! Uses the PDF standard security handler: an owner password that unlocks
//! everything, a user password that opens the file, and permission bits that
//! readers enforce for user-password sessions. Output is always written with a
//! classic cross-reference table; object streams are never used.
//!
//! Empty passwords are rejected. An empty user password would produce a file
//! that opens without prompting, which is not a protected artifact.
//!
//! The trailer `/ID` is stored in the clear, so it is an HMAC of the text keyed
//! by the owner password rather than a plain digest of the text.

use std::fmt;

use hmac::{Hmac, Mac};
use log::debug;
use lopdf::{EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use sha2::Sha256;
use serde::{Deserialize, Serialize};

use super::SanitizedDocument;
use crate::errors::{VeilError, VeilResult};

type HmacSha256 = Hmac<Sha256>;

/// Length of each `/ID` entry, in bytes.
const FILE_ID_LEN: usize = 16;

/// Header version written in compatibility mode.
const COMPATIBILITY_PDF_VERSION: &str = "1.3";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintingPermission {
    None,
    LowResolution,
    #[default]
    HighResolution,
}

/// What a user-password session may do. Defaults: high resolution printing
/// allowed, everything else denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PermissionPolicy {
    pub printing: PrintingPermission,
    pub modifying: bool,
    pub copying: bool,
    pub annotating: bool,
    pub filling_forms: bool,
    pub content_accessibility: bool,
    pub document_assembly: bool,
}

impl PermissionPolicy {
    fn to_permissions(self) -> Permissions {
        let mut permissions = Permissions::empty();
        match self.printing {
            PrintingPermission::None => {}
            PrintingPermission::LowResolution => permissions |= Permissions::PRINTABLE,
            PrintingPermission::HighResolution => {
                permissions |= Permissions::PRINTABLE | Permissions::PRINTABLE_IN_HIGH_QUALITY
            }
        }
        let flags = [
            (self.modifying, Permissions::MODIFIABLE),
            (self.copying, Permissions::COPYABLE),
            (self.annotating, Permissions::ANNOTABLE),
            (self.filling_forms, Permissions::FILLABLE),
            (self.content_accessibility, Permissions::COPYABLE_FOR_ACCESSIBILITY),
            (self.document_assembly, Permissions::ASSEMBLABLE),
        ];
        for (granted, flag) in flags {
            if granted {
                permissions |= flag;
            }
        }
        permissions
    }
}

/// Standard security handler revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum EncryptionRevision {
    /// RC4 with a 40-bit key (V1, R2). For legacy readers only.
    #[serde(rename = "rc4_40")]
    Rc4Bits40,
    /// RC4 with a 128-bit key (V2, R3).
    #[default]
    #[serde(rename = "rc4_128")]
    Rc4Bits128,
}

impl EncryptionRevision {
    /// Revision 2 readers predate compressed streams in encrypted files.
    pub fn requires_compatibility(self) -> bool {
        matches!(self, EncryptionRevision::Rc4Bits40)
    }
}

/// Passwords and permissions for one serialization. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub owner_password: String,
    pub user_password: String,
    pub permissions: PermissionPolicy,
    pub revision: EncryptionRevision,
    pub compatibility_mode: bool,
}

impl PasswordPolicy {
    /// Same password for owner and user, default permissions and revision.
    pub fn with_password(password: &str) -> Self {
        Self {
            owner_password: password.to_string(),
            user_password: password.to_string(),
            permissions: PermissionPolicy::default(),
            revision: EncryptionRevision::default(),
            compatibility_mode: false,
        }
    }

    /// Returns a copy of this policy with both passwords replaced.
    pub fn rekeyed(&self, password: &str) -> Self {
        Self {
            owner_password: password.to_string(),
            user_password: password.to_string(),
            ..self.clone()
        }
    }

    /// Keeps permissions and revision, drops both passwords.
    pub fn without_passwords(&self) -> Self {
        Self {
            owner_password: String::new(),
            user_password: String::new(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> VeilResult<()> {
        if self.user_password.is_empty() {
            return Err(VeilError::Encryption("user password must not be empty".to_string()));
        }
        if self.owner_password.is_empty() {
            return Err(VeilError::Encryption("owner password must not be empty".to_string()));
        }
        Ok(())
    }

    fn uses_compatibility(&self) -> bool {
        self.compatibility_mode || self.revision.requires_compatibility()
    }
}

impl fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordPolicy")
            .field("owner_password", &"<hidden>")
            .field("user_password", &"<hidden>")
            .field("permissions", &self.permissions)
            .field("revision", &self.revision)
            .field("compatibility_mode", &self.compatibility_mode)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Encryptor;

impl Encryptor {
    pub fn new() -> Self {
        Self
    }

    /// Serializes `document` protected by `policy`.
    ///
    /// The same document and policy always produce the same bytes.
    pub fn encrypt(&self, document: &SanitizedDocument, policy: &PasswordPolicy) -> VeilResult<Vec<u8>> {
        policy.validate()?;

        let mut output = document.document.clone();
        if policy.uses_compatibility() {
            output.version = COMPATIBILITY_PDF_VERSION.to_string();
        } else {
            output.compress();
        }

        let file_id = file_identifier(document, policy)?;
        output.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(file_id.clone(), StringFormat::Hexadecimal),
                Object::String(file_id, StringFormat::Hexadecimal),
            ]),
        );

        let permissions = policy.permissions.to_permissions();
        let version = match policy.revision {
            EncryptionRevision::Rc4Bits40 => EncryptionVersion::V1 {
                document: &output,
                owner_password: &policy.owner_password,
                user_password: &policy.user_password,
                permissions,
            },
            EncryptionRevision::Rc4Bits128 => EncryptionVersion::V2 {
                document: &output,
                owner_password: &policy.owner_password,
                user_password: &policy.user_password,
                key_length: 128,
                permissions,
            },
        };
        let state = EncryptionState::try_from(version)
            .map_err(|e| VeilError::Encryption(format!("failed to derive encryption keys: {}", e)))?;

        output
            .encrypt(&state)
            .map_err(|e| VeilError::Encryption(format!("failed to encrypt document: {}", e)))?;

        let mut buffer = Vec::new();
        output
            .save_to(&mut buffer)
            .map_err(|e| VeilError::Encryption(format!("failed to serialize document: {}", e)))?;

        debug!(
            "Encrypted {} page(s) with {:?} into {} bytes",
            document.page_count(),
            policy.revision,
            buffer.len()
        );
        Ok(buffer)
    }
}

/// Same document and owner password give the same identifier.
fn file_identifier(document: &SanitizedDocument, policy: &PasswordPolicy) -> VeilResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(policy.owner_password.as_bytes())
        .map_err(|e| VeilError::Encryption(format!("failed to derive file identifier: {}", e)))?;
    mac.update(document.text().as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(digest[..FILE_ID_LEN].to_vec())
}
