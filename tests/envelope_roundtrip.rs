//! Envelope, sealed configuration and SSE-C behaviour through the public API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tempfile::tempdir;

use s3_photo_vault::crypto::{
    md5, open, seal, sha256, EncryptionEnvelope, IV_LEN, PBKDF2_ITERATIONS, SALT_LEN, TAG_LEN,
};
use s3_photo_vault::{
    build_headers, Configuration, ContentCipher, CustomerKeyMaterial, RequestSigner, VaultError,
};

const PASSPHRASE: &str = "sunset over the harbour 2024";

fn config() -> Configuration {
    Configuration::builder()
        .endpoint("https://minio.home.lan:9000")
        .region("eu-central-1")
        .bucket("photos")
        .access_key_id("HOMELABACCESSKEY")
        .secret_access_key("homelab-secret-key-value")
        .encryption_passphrase(PASSPHRASE)
        .build()
        .unwrap()
}

#[test]
fn photo_survives_binary_envelope() {
    let photo: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    let config = config();
    let cipher = ContentCipher::new(&config);

    let sealed = cipher.seal_bytes(&photo).unwrap();
    assert_eq!(&sealed[..4], b"PVE1");
    assert_eq!(sealed.len(), 4 + 1 + SALT_LEN + IV_LEN + photo.len() + TAG_LEN);

    assert_eq!(cipher.open_bytes(&sealed).unwrap(), photo);
}

#[test]
fn two_seals_never_share_salt_or_iv() {
    let a = seal(b"same photo", PASSPHRASE).unwrap();
    let b = seal(b"same photo", PASSPHRASE).unwrap();

    assert_ne!(a.salt, b.salt);
    assert_ne!(a.iv, b.iv);
    assert_ne!(a.ciphertext, b.ciphertext);
}

#[test]
fn wrong_passphrase_and_tampering_look_the_same() {
    let envelope = seal(b"beach.jpg", PASSPHRASE).unwrap();

    let wrong = open(&envelope, "some other passphrase").unwrap_err();

    let mut tampered = envelope.clone();
    tampered.ciphertext[0] ^= 0x01;
    let corrupted = open(&tampered, PASSPHRASE).unwrap_err();

    assert!(matches!(wrong, VaultError::Authentication));
    assert!(matches!(corrupted, VaultError::Authentication));
    assert_eq!(wrong.to_string(), corrupted.to_string());
}

#[test]
fn text_envelope_carries_all_fields() {
    let envelope = seal(b"note", PASSPHRASE).unwrap();
    let text = envelope.to_text().unwrap();

    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["algorithm"], "AES-256-GCM");
    for field in ["ciphertext", "iv", "salt"] {
        assert!(STANDARD.decode(json[field].as_str().unwrap()).is_ok());
    }

    assert_eq!(EncryptionEnvelope::from_text(&text).unwrap(), envelope);
}

#[test]
fn sealed_config_travels_through_text_and_disk() {
    let dir = tempdir().unwrap();
    let config = config();

    let sealed = config.seal("transfer code 1234").unwrap();
    let opened = Configuration::open_sealed(&sealed, "transfer code 1234").unwrap();
    assert_eq!(opened.bucket(), "photos");
    assert_eq!(opened.endpoint().as_str(), "https://minio.home.lan:9000/");

    let path = dir.path().join("photo-vault.json");
    opened.to_config_file().save(&path).unwrap();
    let reloaded = Configuration::from_file(&path).unwrap();
    assert_eq!(reloaded.access_key_id(), "HOMELABACCESSKEY");

    assert!(matches!(
        Configuration::open_sealed(&sealed, "transfer code 9999"),
        Err(VaultError::Authentication)
    ));
}

#[test]
fn customer_key_headers_match_independent_md5() {
    let config = config();
    let signer = RequestSigner::new(&config).unwrap();
    let headers = signer.customer_key_headers().unwrap();

    let raw = sha256(PASSPHRASE.as_bytes());
    assert_eq!(headers.key.as_str(), STANDARD.encode(raw));
    assert_eq!(headers.key_md5, STANDARD.encode(md5(&raw)));

    let material = CustomerKeyMaterial::derive(PASSPHRASE).unwrap();
    assert_eq!(build_headers(&material).key_md5, headers.key_md5);
}

#[test]
fn iteration_floor_is_interop_constant() {
    assert_eq!(PBKDF2_ITERATIONS, 100_000);
}
