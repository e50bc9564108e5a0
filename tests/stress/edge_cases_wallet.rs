//! Edge case tests: wallet framing, header ordering, service validation,
//! truncated streams and adapter failures.

use cpk::wallet::{FrameReader, ProtocolState, WalletProtocol, FRAME_DELIMITER};
use cpk::{CpkError, CryptoAdapter, PassphraseAdapter, Record, Service, Wallet};

/// Pass-through adapter so frames can be written by hand.
struct Plain;

impl CryptoAdapter for Plain {
    fn encrypt(&self, plaintext: &[u8]) -> cpk::Result<Vec<u8>> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&self, ciphertext: &[u8]) -> cpk::Result<Vec<u8>> {
        Ok(ciphertext.to_vec())
    }
}

/// Adapter that refuses every frame.
struct Broken;

impl CryptoAdapter for Broken {
    fn encrypt(&self, _: &[u8]) -> cpk::Result<Vec<u8>> {
        Err(CpkError::EncryptionFailed("broken".to_string()))
    }

    fn decrypt(&self, _: &[u8]) -> cpk::Result<Vec<u8>> {
        Err(CpkError::DecryptionFailed("broken".to_string()))
    }
}

fn frames(docs: &[&str]) -> Vec<u8> {
    docs.iter()
        .flat_map(|d| d.bytes().chain(FRAME_DELIMITER.iter().copied()))
        .collect()
}

fn sample_wallet() -> Wallet {
    let web = Service::new("web", ["user", "host"], ["pass"]).unwrap();
    let pin = Service::new("pin", Vec::<String>::new(), ["pin"]).unwrap();
    let mut wallet = Wallet::new();
    wallet.add_service(web.clone()).unwrap();
    wallet.add_service(pin.clone()).unwrap();
    for i in 0..5 {
        let user = format!("user{i}");
        let record = Record::new(&web, [("user", user.as_str()), ("pass", "p\n\nq")]).unwrap();
        wallet.add_record(record).unwrap();
    }
    wallet
        .add_record(Record::new(&pin, [("pin", "0000")]).unwrap())
        .unwrap();
    wallet
}

// === Framing ===

#[test]
fn edge_secret_containing_delimiter_survives_encryption() {
    let wallet = sample_wallet();
    let adapter = PassphraseAdapter::new("pass");
    let bytes = wallet.encode(&adapter).unwrap();
    assert_eq!(FrameReader::new(&bytes).count(), 1 + wallet.records().len());

    let decoded = Wallet::decode(&bytes, &adapter).unwrap();
    assert_eq!(decoded.records()[0].get("pass"), Some("p\n\nq"));
}

#[test]
fn edge_plain_json_escapes_newlines() {
    // Compact JSON escapes control characters, so even a pass-through adapter
    // keeps frames intact.
    let wallet = sample_wallet();
    let bytes = wallet.encode(&Plain).unwrap();
    assert_eq!(Wallet::decode(&bytes, &Plain).unwrap(), wallet);
}

#[test]
fn edge_stream_without_final_delimiter_is_truncated() {
    let mut bytes = frames(&[r#"{"services":[]}"#]);
    bytes.pop();
    assert!(matches!(
        Wallet::decode(&bytes, &Plain),
        Err(CpkError::TruncatedStream(_))
    ));
}

#[test]
fn edge_truncated_encrypted_wallet() {
    let adapter = PassphraseAdapter::new("pass");
    let bytes = sample_wallet().encode(&adapter).unwrap();
    let cut = &bytes[..bytes.len() - 10];
    assert!(Wallet::decode(cut, &adapter).is_err());
}

#[test]
fn edge_reader_is_pull_based() {
    let bytes = frames(&["a", "b", "c"]);
    let mut reader = FrameReader::new(&bytes);
    assert_eq!(reader.next(), Some(&b"a"[..]));
    assert_eq!(reader.remaining(), b"b\n\nc\n\n");
    assert_eq!(reader.by_ref().count(), 2);
    reader.finish().unwrap();
}

// === Header ===

#[test]
fn edge_header_must_come_first() {
    let bytes = frames(&[
        r#"{"service_name":"web","attrs":{}}"#,
        r#"{"services":[{"name":"web"}]}"#,
    ]);
    assert!(matches!(
        Wallet::decode(&bytes, &Plain),
        Err(CpkError::UnknownService(ref s)) if s == "web"
    ));
}

#[test]
fn edge_second_header_is_not_a_record() {
    let bytes = frames(&[r#"{"services":[]}"#, r#"{"services":[]}"#]);
    assert!(matches!(
        Wallet::decode(&bytes, &Plain),
        Err(CpkError::InvalidFrame(_))
    ));
}

#[test]
fn edge_header_lists_default_to_empty() {
    let bytes = frames(&[r#"{"services":[{"name":"bare"}]}"#]);
    let wallet = Wallet::decode(&bytes, &Plain).unwrap();
    let bare = wallet.get_service("bare").unwrap();
    assert!(bare.id_attr_names().is_empty());
    assert!(bare.secret_attr_names().is_empty());
}

#[test]
fn edge_header_role_conflict() {
    let bytes = frames(&[r#"{"services":[{"name":"web","id_as":["u"],"password_as":["u"]}]}"#]);
    assert!(matches!(
        Wallet::decode(&bytes, &Plain),
        Err(CpkError::AttributeRoleConflict { .. })
    ));
}

#[test]
fn edge_duplicate_service_aborts_decode() {
    let bytes = frames(&[
        r#"{"services":[{"name":"web"},{"name":"mail"},{"name":"web"}]}"#,
        r#"{"service_name":"mail","attrs":{}}"#,
    ]);
    assert!(matches!(
        Wallet::decode(&bytes, &Plain),
        Err(CpkError::DuplicateService(ref s)) if s == "web"
    ));
}

#[test]
fn edge_protocol_state_machine() {
    let mut wallet = Wallet::new();
    let mut protocol = WalletProtocol::new(&Plain);
    assert_eq!(protocol.state(), ProtocolState::AwaitingHeader);
    assert!(protocol.feed(&mut wallet, b"not json").is_err());
    assert_eq!(
        protocol.state(),
        ProtocolState::AwaitingHeader,
        "a rejected frame does not advance the state"
    );
    protocol
        .feed(&mut wallet, br#"{"services":[{"name":"a","id_as":["k"]}]}"#)
        .unwrap();
    assert_eq!(protocol.state(), ProtocolState::AwaitingRecord);
    protocol
        .feed(&mut wallet, br#"{"service_name":"a","attrs":{"k":"v"}}"#)
        .unwrap();
    assert_eq!(wallet.records().len(), 1);
    assert_eq!(protocol.frames(), 2);
}

// === Adapters ===

#[test]
fn edge_adapter_failures_propagate() {
    assert!(matches!(
        Wallet::new().encode(&Broken),
        Err(CpkError::EncryptionFailed(_))
    ));
    assert!(matches!(
        Wallet::decode(&frames(&["x"]), &Broken),
        Err(CpkError::DecryptionFailed(_))
    ));
    // No frames, nothing to decrypt.
    assert!(Wallet::decode(b"", &Broken).is_ok());
}

#[test]
fn edge_wrong_passphrase_rejected() {
    let bytes = sample_wallet()
        .encode(&PassphraseAdapter::new("right"))
        .unwrap();
    assert!(matches!(
        Wallet::decode(&bytes, &PassphraseAdapter::new("wrong")),
        Err(CpkError::InvalidPassphrase)
    ));
}

#[test]
fn edge_tampered_frame_rejected() {
    let adapter = PassphraseAdapter::new("pass");
    let mut bytes = sample_wallet().encode(&adapter).unwrap();
    // Flip one base64 character inside the first frame.
    bytes[30] = if bytes[30] == b'A' { b'B' } else { b'A' };
    assert!(Wallet::decode(&bytes, &adapter).is_err());
}
