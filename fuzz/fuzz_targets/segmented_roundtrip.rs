#![no_main]

use cipher_glue::modes::{cbc, cfb, gcm, xts};
use cipher_glue::{AeadRequest, GlueConfig, ScatterList, SkcipherRequest};
use libfuzzer_sys::fuzz_target;

const HEADER: usize = 1 + 32 + 16 + 4;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER {
        return;
    }

    let selector = data[0];
    let key = &data[1..33];
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&data[33..49]);
    let layout: Vec<usize> = data[49..53].iter().map(|&b| b as usize + 1).collect();
    let payload = &data[HEADER..];
    let config = GlueConfig::default();

    match selector % 4 {
        0 | 1 | 2 => {
            let descriptor = match selector % 4 {
                0 => cbc::descriptor(&config),
                1 => cfb::descriptor(&config),
                _ => xts::descriptor(&config),
            };
            let mut tfm = match descriptor.instantiate_skcipher() {
                Ok(tfm) => tfm,
                Err(_) => return,
            };
            if tfm.set_key(key).is_err() {
                return;
            }

            let src = ScatterList::split(payload, &layout);
            let mut sealed = ScatterList::zeroed(&[payload.len()]);
            let mut req = SkcipherRequest::new(&src, &mut sealed, payload.len(), iv);
            if tfm.encrypt(&mut req).is_err() {
                return;
            }
            drop(req);

            let mut opened = ScatterList::split(&sealed.to_vec(), &layout[1..]);
            let mut req = SkcipherRequest::in_place(&mut opened, payload.len(), iv);
            tfm.decrypt(&mut req).expect("decrypt after successful encrypt");
            drop(req);
            assert_eq!(opened.to_vec(), payload);
        }
        _ => {
            let mut tfm = match gcm::descriptor(&config).instantiate_aead() {
                Ok(tfm) => tfm,
                Err(_) => return,
            };
            if tfm.set_key(&key[..16]).is_err() {
                return;
            }

            let assoclen = layout[0].min(payload.len());
            let cryptlen = payload.len() - assoclen;
            let src = ScatterList::split(payload, &layout);
            let mut sealed = ScatterList::zeroed(&[payload.len() + 16]);
            let mut req = AeadRequest::new(&src, &mut sealed, assoclen, cryptlen, &iv[..12]);
            tfm.encrypt(&mut req).expect("GCM seal");
            drop(req);

            let mut opened = ScatterList::split(&sealed.to_vec(), &layout[2..]);
            let mut req = AeadRequest::in_place(&mut opened, assoclen, cryptlen + 16, &iv[..12]);
            tfm.decrypt(&mut req).expect("GCM open of fresh ciphertext");
            drop(req);
            assert_eq!(&opened.to_vec()[..payload.len()], payload);
        }
    }
});
