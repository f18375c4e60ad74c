//! Store/retrieve round trips across every cipher, compressor and backend.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use npad_compress::{CompressionAlgorithm, Compressor};
use npad_core::config::BackendKind;
use npad_core::{NpadError, RetentionClass};
use npad_crypto::CipherAlgorithm;
use npad_storage::{FsBackend, MemoryBackend, ObjectBackend};
use npad_store::{GarbageCollector, PasteStore, StoreSettings};

fn sample_text() -> Vec<u8> {
    let mut text = Vec::new();
    for i in 0..400 {
        text.extend_from_slice(format!("line {i}: the quick brown fox\n").as_bytes());
    }
    text
}

fn memory_store(compressor: Compressor, cipher: Option<CipherAlgorithm>) -> PasteStore {
    PasteStore::new(
        StoreSettings::new(compressor, cipher, BackendKind::Memory),
        Arc::new(MemoryBackend::new()),
    )
}

#[test]
fn roundtrip_every_cipher_and_compressor() {
    let mut compressors = vec![Compressor::DISABLED];
    for algorithm in [
        CompressionAlgorithm::Gzip,
        CompressionAlgorithm::Deflate,
        CompressionAlgorithm::Zstd,
    ] {
        for level in [1, 6, algorithm.max_level()] {
            compressors.push(Compressor::new(algorithm, level));
        }
    }
    let mut ciphers: Vec<Option<CipherAlgorithm>> = vec![None];
    ciphers.extend(CipherAlgorithm::ALL.into_iter().map(Some));

    let text = sample_text();
    for compressor in &compressors {
        for cipher in &ciphers {
            let store = memory_store(*compressor, *cipher);
            for payload in [&b""[..], &b"x"[..], &text[..]] {
                let token = store
                    .store(payload, RetentionClass::Day, "")
                    .unwrap_or_else(|e| panic!("{compressor} / {cipher:?}: store failed: {e}"));
                let back = store
                    .retrieve(&token, false)
                    .unwrap_or_else(|e| panic!("{compressor} / {cipher:?}: retrieve failed: {e}"));
                assert_eq!(back, payload, "{compressor} / {cipher:?}");
            }
        }
    }
}

#[test]
fn roundtrip_on_filesystem_survives_reopen() {
    let tmp = tempfile::TempDir::new().unwrap();
    let settings = StoreSettings::new(
        Compressor::new(CompressionAlgorithm::Zstd, 3),
        Some(CipherAlgorithm::XChaCha20Poly1305),
        BackendKind::Fs,
    );
    let text = sample_text();

    let token = {
        let store = PasteStore::new(settings, Arc::new(FsBackend::open(tmp.path()).unwrap()));
        store.store(&text, RetentionClass::Permanent, "notes").unwrap()
    };

    let reopened = PasteStore::new(settings, Arc::new(FsBackend::open(tmp.path()).unwrap()));
    assert_eq!(reopened.retrieve(&token, false).unwrap(), text);

    // Exactly one file, named by the truncated key.
    let names: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names.len(), 1);
    let (prefix, rest) = token.split_once('@').unwrap();
    assert_eq!(names[0], format!("{prefix}@{}@notes", &rest[..16]));
}

#[test]
fn size_cap_is_inclusive() {
    let store = memory_store(Compressor::DISABLED, Some(CipherAlgorithm::AesGcm));
    for class in RetentionClass::ALL {
        let at_cap = vec![b'a'; class.max_bytes()];
        let token = store.store(&at_cap, class, "").unwrap();
        assert_eq!(store.retrieve(&token, false).unwrap().len(), class.max_bytes());

        let over = vec![b'a'; class.max_bytes() + 1];
        match store.store(&over, class, "") {
            Err(NpadError::InputTooLarge { limit, size, .. }) => {
                assert_eq!(limit, class.max_bytes());
                assert_eq!(size, class.max_bytes() + 1);
            }
            other => panic!("{class}: expected InputTooLarge, got {other:?}"),
        }
    }
    assert_eq!(store.backend().len().unwrap(), RetentionClass::ALL.len());
}

#[test]
fn any_bit_flip_fails_authentication() {
    for cipher in CipherAlgorithm::ALL {
        let store = memory_store(Compressor::DISABLED, Some(cipher));
        let token = store.store(b"tamper with me", RetentionClass::Day, "").unwrap();
        let key = store.backend().list().unwrap().pop().unwrap();
        let original = store.backend().get(&key).unwrap().unwrap();

        for bit in 0..original.len() * 8 {
            let mut tampered = original.clone();
            tampered[bit / 8] ^= 1 << (bit % 8);
            store.backend().put(&key, &tampered).unwrap();
            assert!(
                matches!(
                    store.retrieve(&token, false),
                    Err(NpadError::AuthenticationFailure)
                ),
                "{cipher}: bit {bit} flip went undetected"
            );
        }

        store.backend().put(&key, &original).unwrap();
        assert_eq!(store.retrieve(&token, false).unwrap(), b"tamper with me");
    }
}

#[test]
fn filename_alone_cannot_read_encrypted_paste() {
    let store = memory_store(Compressor::DISABLED, Some(CipherAlgorithm::AesGcm));
    let token = store.store(b"private", RetentionClass::Day, "").unwrap();
    let key = store.backend().list().unwrap().pop().unwrap();

    // The storage key is all an attacker with directory access sees.
    let err = store.retrieve(&key, false).unwrap_err();
    assert!(err.is_concealed_not_found(), "{err:?}");

    // Pad the filename secret out to a full-length secret: still wrong.
    let (prefix, short) = key.split_once('@').unwrap();
    let guess = format!("{prefix}@{short}{}", "A".repeat(48));
    let err = store.retrieve(&guess, false).unwrap_err();
    assert!(matches!(err, NpadError::AuthenticationFailure));
    assert!(store.retrieve(&token, false).is_ok());
}

#[test]
fn expiry_short_vs_permanent() {
    let store = memory_store(Compressor::DISABLED, None);
    let short = store.store(b"soon gone", RetentionClass::Short, "").unwrap();
    let forever = store.store(b"stays", RetentionClass::Permanent, "").unwrap();

    assert!(!store.is_expired(&short));
    assert!(!store.is_expired(&forever));

    let later = npad_core::clock::now_unix() + 20 * 60 + 1;
    assert!(npad_store::is_expired(&short, later));
    assert!(!npad_store::is_expired(&forever, later));
    assert!(!npad_store::is_expired(&forever, i64::MAX));

    assert!(matches!(
        store.retrieve_at(&short, false, later),
        Err(NpadError::NotFound)
    ));
    assert_eq!(store.retrieve_at(&forever, false, later).unwrap(), b"stays");
}

fn gc_is_idempotent_on(backend: Arc<dyn ObjectBackend>) {
    let store = PasteStore::new(
        StoreSettings::new(
            Compressor::new(CompressionAlgorithm::Gzip, 6),
            Some(CipherAlgorithm::AesSiv),
            backend.kind(),
        ),
        backend.clone(),
    );
    let past = UNIX_EPOCH + Duration::from_secs(1_000_000);
    let expired: Vec<String> = (0..3)
        .map(|i| {
            store
                .store_at(format!("old {i}").as_bytes(), RetentionClass::Short, "", past)
                .unwrap()
        })
        .collect();
    let live = store.store(b"fresh", RetentionClass::Short, "").unwrap();
    let forever = store
        .store_at(b"forever", RetentionClass::Permanent, "", past)
        .unwrap();

    let mut gc = GarbageCollector::new(backend.clone());
    let now = npad_core::clock::now_unix();
    let first = gc.sweep(now).unwrap();
    assert_eq!(first.scanned, 5);
    assert_eq!(first.removed, 3);
    assert_eq!(first.remaining, 2);

    let second = gc.sweep(now).unwrap();
    assert_eq!(second.removed, 0);
    assert_eq!(second.remaining, 2);

    for token in &expired {
        assert!(store.retrieve(token, false).is_err());
    }
    assert_eq!(store.retrieve(&live, false).unwrap(), b"fresh");
    assert_eq!(store.retrieve(&forever, false).unwrap(), b"forever");
}

#[test]
fn gc_idempotent_memory() {
    gc_is_idempotent_on(Arc::new(MemoryBackend::new()));
}

#[test]
fn gc_idempotent_filesystem() {
    let tmp = tempfile::TempDir::new().unwrap();
    gc_is_idempotent_on(Arc::new(FsBackend::open(tmp.path()).unwrap()));
}

#[test]
fn gzip_plain_named_paste() {
    let store = memory_store(Compressor::new(CompressionAlgorithm::Gzip, 6), None);
    let before = npad_core::clock::now_unix();
    let token = store.store(b"hello world", RetentionClass::Day, "greet").unwrap();

    let fields: Vec<&str> = token.split('@').collect();
    assert_eq!(fields.len(), 3, "{token}");
    let expires: i64 = fields[0].strip_prefix('X').unwrap().parse().unwrap();
    assert!(expires >= before + 8 * 3600);
    assert_eq!(fields[1].len(), 16);
    assert!(fields[1]
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    assert_eq!(fields[2], "greet");

    assert_eq!(store.retrieve(&token, false).unwrap(), b"hello world");

    let mut altered: Vec<u8> = fields[1].bytes().collect();
    altered[5] = if altered[5] == b'a' { b'b' } else { b'a' };
    let altered = format!(
        "{}@{}@greet",
        fields[0],
        String::from_utf8(altered).unwrap()
    );
    assert!(matches!(
        store.retrieve(&altered, false),
        Err(NpadError::NotFound)
    ));
}

#[test]
fn changed_settings_cannot_read_old_pastes() {
    let backend: Arc<dyn ObjectBackend> = Arc::new(MemoryBackend::new());
    let writer = PasteStore::new(
        StoreSettings::new(
            Compressor::new(CompressionAlgorithm::Zstd, 3),
            Some(CipherAlgorithm::AesGcm),
            BackendKind::Memory,
        ),
        backend.clone(),
    );
    let token = writer.store(b"written once", RetentionClass::Day, "").unwrap();

    let reader = PasteStore::new(
        StoreSettings::new(
            Compressor::new(CompressionAlgorithm::Zstd, 3),
            Some(CipherAlgorithm::ChaCha20Poly1305),
            BackendKind::Memory,
        ),
        backend,
    );
    assert!(reader.retrieve(&token, false).is_err());
}

#[test]
fn concurrent_store_and_retrieve() {
    let store = memory_store(
        Compressor::new(CompressionAlgorithm::Deflate, 5),
        Some(CipherAlgorithm::ChaCha20Poly1305),
    );
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    let text = format!("thread {t} paste {i}");
                    let token = store
                        .store(text.as_bytes(), RetentionClass::Fortnight, "")
                        .unwrap();
                    assert_eq!(store.retrieve(&token, false).unwrap(), text.as_bytes());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(store.backend().len().unwrap(), 200);
}

#[test]
fn store_at_uses_given_clock() {
    let store = memory_store(Compressor::DISABLED, None);
    let created = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let token = store
        .store_at(b"x", RetentionClass::Fortnight, "", created)
        .unwrap();
    assert!(token.starts_with("X1701209600@"));
}

#[test]
fn corrupt_compressed_payload_is_decode_error() {
    for algorithm in [
        CompressionAlgorithm::Gzip,
        CompressionAlgorithm::Deflate,
        CompressionAlgorithm::Zstd,
    ] {
        let store = memory_store(Compressor::new(algorithm, 6), None);
        let token = store.store(&sample_text(), RetentionClass::Day, "").unwrap();
        let key = store.backend().list().unwrap().pop().unwrap();
        store
            .backend()
            .put(&key, b"not a compressed stream at all")
            .unwrap();

        assert!(
            matches!(store.retrieve(&token, false), Err(NpadError::Decode(_))),
            "{algorithm}: corrupt payload was not a decode error"
        );
        // Raw mode hands back the stored bytes untouched.
        assert_eq!(
            store.retrieve(&token, true).unwrap(),
            b"not a compressed stream at all"
        );
    }
}
