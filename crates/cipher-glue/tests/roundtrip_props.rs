use cipher_glue::modes::{cbc, cfb, gcm, xts};
use cipher_glue::{
    Aead, AeadRequest, GlueConfig, GlueError, Registry, ScatterList, Skcipher, SkcipherRequest,
};
use proptest::prelude::*;

fn skcipher(descriptor: cipher_glue::AlgorithmDescriptor, key: &[u8]) -> Box<dyn Skcipher> {
    let mut tfm = descriptor.instantiate_skcipher().unwrap();
    tfm.set_key(key).unwrap();
    tfm
}

fn aead(key: &[u8]) -> Box<dyn Aead> {
    let mut tfm = gcm::descriptor(&GlueConfig::default())
        .instantiate_aead()
        .unwrap();
    tfm.set_key(key).unwrap();
    tfm
}

/// Encrypt or decrypt with a source and destination list, returning the
/// destination bytes and the IV the request ends with.
fn crypt(
    tfm: &mut dyn Skcipher,
    data: &[u8],
    src_layout: &[usize],
    dst_layout: &[usize],
    iv: [u8; 16],
    encrypt: bool,
) -> (Vec<u8>, [u8; 16]) {
    let src = ScatterList::split(data, src_layout);
    let mut dst = ScatterList::split(&vec![0u8; data.len()], dst_layout);
    let mut req = SkcipherRequest::new(&src, &mut dst, data.len(), iv);
    if encrypt {
        tfm.encrypt(&mut req).unwrap();
    } else {
        tfm.decrypt(&mut req).unwrap();
    }
    let out_iv = *req.iv();
    drop(req);
    (dst.to_vec(), out_iv)
}

fn layout() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..40, 0..8)
}

fn blocks() -> impl Strategy<Value = Vec<u8>> {
    (0usize..8).prop_flat_map(|n| prop::collection::vec(any::<u8>(), n * 16))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cbc_segmentation_invariant(
        key_len in prop::sample::select(vec![16usize, 24, 32]),
        key in prop::collection::vec(any::<u8>(), 32),
        iv in any::<[u8; 16]>(),
        data in blocks(),
        src_layout in layout(),
        dst_layout in layout(),
    ) {
        let key = &key[..key_len];
        let mut tfm = skcipher(cbc::descriptor(&GlueConfig::default()), key);

        let (flat, flat_iv) = crypt(tfm.as_mut(), &data, &[], &[], iv, true);
        let (ragged, ragged_iv) = crypt(tfm.as_mut(), &data, &src_layout, &dst_layout, iv, true);
        prop_assert_eq!(&flat, &ragged);
        prop_assert_eq!(flat_iv, ragged_iv);
        if !data.is_empty() {
            prop_assert_eq!(&flat_iv[..], &flat[flat.len() - 16..]);
        }

        let (back, _) = crypt(tfm.as_mut(), &ragged, &dst_layout, &src_layout, iv, false);
        prop_assert_eq!(back, data);
    }

    #[test]
    fn prop_cfb_any_length(
        key in any::<[u8; 32]>(),
        iv in any::<[u8; 16]>(),
        data in prop::collection::vec(any::<u8>(), 0..200),
        src_layout in layout(),
        dst_layout in layout(),
    ) {
        let mut tfm = skcipher(cfb::descriptor(&GlueConfig::default()), &key);

        let (flat, _) = crypt(tfm.as_mut(), &data, &[], &[], iv, true);
        let (ragged, _) = crypt(tfm.as_mut(), &data, &src_layout, &dst_layout, iv, true);
        prop_assert_eq!(&flat, &ragged);

        let (back, _) = crypt(tfm.as_mut(), &ragged, &dst_layout, &src_layout, iv, false);
        prop_assert_eq!(back, data);
    }

    #[test]
    fn prop_xts_units(
        wide in any::<bool>(),
        key in prop::collection::vec(any::<u8>(), 64),
        tweak in any::<[u8; 16]>(),
        data in prop::collection::vec(any::<u8>(), 16..300),
        src_layout in layout(),
        dst_layout in layout(),
    ) {
        let key = if wide { &key[..] } else { &key[..32] };
        let mut tfm = skcipher(xts::descriptor(&GlueConfig::default()), key);

        let (flat, flat_tweak) = crypt(tfm.as_mut(), &data, &[], &[], tweak, true);
        let (ragged, _) = crypt(tfm.as_mut(), &data, &src_layout, &dst_layout, tweak, true);
        prop_assert_eq!(&flat, &ragged);
        // XTS requests do not chain.
        prop_assert_eq!(flat_tweak, tweak);

        let (back, _) = crypt(tfm.as_mut(), &ragged, &dst_layout, &src_layout, tweak, false);
        prop_assert_eq!(back, data);
    }

    #[test]
    fn prop_gcm_seal_open(
        key in any::<[u8; 16]>(),
        iv in any::<[u8; 12]>(),
        aad in prop::collection::vec(any::<u8>(), 0..40),
        plaintext in prop::collection::vec(any::<u8>(), 0..100),
        src_layout in layout(),
        dst_layout in layout(),
        flip in any::<prop::sample::Index>(),
    ) {
        let mut tfm = aead(&key);
        let mut input = aad.clone();
        input.extend_from_slice(&plaintext);

        let src = ScatterList::split(&input, &src_layout);
        let mut dst = ScatterList::split(&vec![0u8; input.len() + 16], &dst_layout);
        let mut req = AeadRequest::new(&src, &mut dst, aad.len(), plaintext.len(), &iv);
        tfm.encrypt(&mut req).unwrap();
        drop(req);
        let sealed = dst.to_vec();

        let mut opened = ScatterList::split(&sealed, &src_layout);
        let mut req = AeadRequest::in_place(&mut opened, aad.len(), plaintext.len() + 16, &iv);
        tfm.decrypt(&mut req).unwrap();
        drop(req);
        prop_assert_eq!(&opened.to_vec()[aad.len()..input.len()], &plaintext[..]);

        // Any flipped bit in the ciphertext or tag is caught.
        let mut forged = sealed.clone();
        let at = aad.len() + flip.index(plaintext.len() + 16);
        forged[at] ^= 0x01;
        let src = ScatterList::split(&forged, &src_layout);
        let mut out = ScatterList::split(&vec![0xaau8; forged.len()], &dst_layout);
        let mut req = AeadRequest::new(&src, &mut out, aad.len(), plaintext.len() + 16, &iv);
        let err = tfm.decrypt(&mut req).unwrap_err();
        drop(req);
        prop_assert!(matches!(err, GlueError::AuthenticationFailure));
        prop_assert!(out.to_vec()[aad.len()..input.len()].iter().all(|&b| b == 0));
    }
}

#[test]
fn test_cbc_requests_chain() {
    let key: [u8; 16] = rand::random();
    let iv: [u8; 16] = rand::random();
    let data: Vec<u8> = (0..96u8).collect();
    let mut tfm = skcipher(cbc::descriptor(&GlueConfig::default()), &key);

    let (whole, _) = crypt(tfm.as_mut(), &data, &[], &[], iv, true);
    let (first, next) = crypt(tfm.as_mut(), &data[..48], &[7], &[], iv, true);
    let (second, _) = crypt(tfm.as_mut(), &data[48..], &[], &[33], next, true);

    assert_eq!(&whole[..48], first.as_slice());
    assert_eq!(&whole[48..], second.as_slice());
}

#[test]
fn test_cfb_requests_chain_on_block_boundaries() {
    let key: [u8; 24] = rand::random();
    let iv: [u8; 16] = rand::random();
    let data: Vec<u8> = (0..64u8).collect();
    let mut tfm = skcipher(cfb::descriptor(&GlueConfig::default()), &key);

    let (whole, _) = crypt(tfm.as_mut(), &data, &[], &[], iv, true);
    let (first, next) = crypt(tfm.as_mut(), &data[..32], &[], &[], iv, true);
    let (second, _) = crypt(tfm.as_mut(), &data[32..], &[5], &[], next, true);

    assert_eq!([first, second].concat(), whole);
}

#[test]
fn test_independent_transforms_across_threads() {
    let mut registry = Registry::new(GlueConfig::default()).unwrap();
    registry.register_all().unwrap();
    let registry = &registry;

    std::thread::scope(|scope| {
        for name in ["cbc(aes)", "cfb(aes)", "xts(aes)", "cbc(aes)"] {
            scope.spawn(move || {
                let key: [u8; 32] = rand::random();
                let iv: [u8; 16] = rand::random();
                let data: Vec<u8> = (0..160).map(|i| (i * 3) as u8).collect();

                let mut tfm = registry.alloc_skcipher(name).unwrap();
                tfm.set_key(&key).unwrap();
                for _ in 0..50 {
                    let (ct, _) = crypt(tfm.as_mut(), &data, &[9, 40], &[64], iv, true);
                    let (pt, _) = crypt(tfm.as_mut(), &ct, &[64], &[1, 1, 1], iv, false);
                    assert_eq!(pt, data, "{name}");
                }
            });
        }

        scope.spawn(move || {
            let key: [u8; 32] = rand::random();
            let mut tfm = registry.alloc_aead("gcm(aes)").unwrap();
            tfm.set_key(&key).unwrap();
            let message = b"concurrent sealed message".to_vec();
            for nonce in 0..50u8 {
                let iv = [nonce; 12];
                let mut list = ScatterList::split(&message, &[3]);
                list.push_segment(vec![0u8; 16]);
                let mut req = AeadRequest::in_place(&mut list, 0, message.len(), &iv);
                tfm.encrypt(&mut req).unwrap();
                drop(req);

                let mut req = AeadRequest::in_place(&mut list, 0, message.len() + 16, &iv);
                tfm.decrypt(&mut req).unwrap();
                drop(req);
                assert_eq!(&list.to_vec()[..message.len()], message.as_slice());
            }
        });
    });
}
