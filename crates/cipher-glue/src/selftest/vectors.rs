//! Known-answer vectors, hex encoded.

// NIST SP 800-38A, F.2.1 / F.3.13: AES-128, four blocks.
pub const SP800_38A_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";
pub const SP800_38A_IV: &str = "000102030405060708090a0b0c0d0e0f";
pub const SP800_38A_PLAINTEXT: &str = "6bc1bee22e409f96e93d7e117393172a\
                                       ae2d8a571e03ac9c9eb76fac45af8e51\
                                       30c81c46a35ce411e5fbc1191a0a52ef\
                                       f69f2445df4f9b17ad2b417be66c3710";
pub const SP800_38A_CBC_CIPHERTEXT: &str = "7649abac8119b246cee98e9b12e9197d\
                                            5086cb9b507219ee95db113a917678b2\
                                            73bed6b8e3c1743b7116e69e22229516\
                                            3ff1caa1681fac09120eca307586e1a7";
pub const SP800_38A_CFB_CIPHERTEXT: &str = "3b3fd92eb72dad20333449f8e83cfb4a\
                                            c8a64537a0b3a93fcde3cdad9f1ce58b\
                                            26751f67a3cbb140b1808cf187a4f4df\
                                            c04b05357c5d1c0eeac4c66f9ff7f2e6";

// AES-256 passage vectors, checked direct against transport.
pub const PASSAGE_KEY: &[u8; 32] = b"0123456789abcdef0123456789abcdef";
pub const PASSAGE_IV: &[u8; 16] = b"1234567890abcdef";
pub const PASSAGE_PLAINTEXT: &[u8; 32] = b"Now is the time for all good men";
pub const PASSAGE_AEAD_PLAINTEXT: &[u8; 24] = b"Now is the time for all ";
pub const PASSAGE_AAD: &str = "feedfacedeadbeeffeedfacedeadbeefabaddad2";

// NIST GCM test case 2: AES-128, zero key and IV, one zero block.
pub const GCM_TC2_KEY: &str = "00000000000000000000000000000000";
pub const GCM_TC2_IV: &str = "000000000000000000000000";
pub const GCM_TC2_PLAINTEXT: &str = "00000000000000000000000000000000";
pub const GCM_TC2_CIPHERTEXT: &str = "0388dace60b6a392f328c2b971b2fe78";
pub const GCM_TC2_TAG: &str = "ab6e47d42cec13bdf53a67b21257bddf";

// NIST GCM test case 4: 60-byte payload, 20-byte AAD.
pub const GCM_TC4_KEY: &str = "feffe9928665731c6d6a8f9467308308";
pub const GCM_TC4_IV: &str = "cafebabefacedbaddecaf888";
pub const GCM_TC4_AAD: &str = "feedfacedeadbeeffeedfacedeadbeefabaddad2";
pub const GCM_TC4_PLAINTEXT: &str = "d9313225f88406e5a55909c5aff5269a\
                                     86a7a9531534f7da2e4c303d8a318a72\
                                     1c3c0c95956809532fcf0e2449a6b525\
                                     b16aedf5aa0de657ba637b39";
pub const GCM_TC4_CIPHERTEXT: &str = "42831ec2217774244b7221b784d0d49c\
                                      e3aa212f2c02a4e035c17e2329aca12e\
                                      21d514b25466931c7d8f6a5aac84aa05\
                                      1ba30b396a0aac973d58e091";
pub const GCM_TC4_TAG: &str = "5bc94fbc3221a5db94fae95ae7121a47";

// IEEE 1619 style XTS-AES-128 vectors.
pub const XTS128_K1: &str = "a1b90cba3f06ac353b2c343876081762\
                             090923026e91771815f29dab01932f2f";
pub const XTS128_I1: &str = "4faef7117cda59c66e4b92013e768ad5";
pub const XTS128_P1: &str = "ebabce95b14d3c8d6fb350390790311c";
pub const XTS128_C1: &str = "778ae8b43cb98d5a825081d5be471c63";

/// 24 bytes: one full block plus an 8-byte stolen tail.
pub const XTS_PP: &str = "ebabce95b14d3c8d6fb350390790311c6e4b92013e768ad5";
pub const XTS128_CP: &str = "2bf72cf3eb85ef7b0b76a0aaf33f258b778ae8b43cb98d5a";

pub const XTS128_K2: &str = "39257905dfcc77766c870a806a60e3c0\
                             93d12acfcb5142fa096989625b60db16";
pub const XTS128_I2: &str = "5cf79db6c5cd991a1c78814224951e84";
pub const XTS128_P2: &str = "bdc5468fbc8d50a10d1c857f791c5cba\
                             b3810d0d73cf8f2046b1d19e7d5d8a56";
pub const XTS128_C2: &str = "d6be046d41f23b5ed70b6b3d5c8e6623\
                             2be6b807d4dcc60eff8dbc1d9f7fc822";

/// Equal key halves: only usable outside certification mode.
pub const XTS128_K3: [u8; 32] = [0x20; 32];
pub const XTS128_I3: [u8; 16] = [0x20; 16];
pub const XTS128_C3: &str = "a20747763fec0c231bd0bd469a273812\
                             95023d5dc6945136a085d2696e870abf\
                             b55addcb80e0fccd";

/// 40 bytes of 0x20 with byte 25 set to 0xff.
pub fn xts128_p3() -> [u8; 40] {
    let mut p3 = [0x20u8; 40];
    p3[25] = 0xff;
    p3
}

// XTS-AES-256 vectors.
pub const XTS256_K1: &str = "1ea661c58d943a0e4801e42f4b094714\
                             9e7f9f8e3e68d0c7505210bd311a0e7c\
                             d6e13ffdf2418d8d1911c004cda58da3\
                             d619b7e2b9141e58318eea392cf41b08";
pub const XTS256_I1: &str = "adf8d92627464ad2f0428e84a9f87564";
pub const XTS256_P1: &str = "2eedea52cd8215e1acc647e810bbc364\
                             2e87287f8d2e57e36c0a24fbc12a202e";
pub const XTS256_C1: &str = "cbaad0e2f6cea3f50b37f934d46a9b13\
                             0b9d54f07e34f36af793e86f73c6d7db";
pub const XTS256_CP: &str = "655e1d374a91e76c4f8392bc5a105527610e5adecac512d8";

pub const XTS256_K2: &str = "ad504b85d751bfba6913b4cc79b65a62\
                             f7f39d360f35b5ec4a7e95bd9ba5f2ec\
                             c1d77ea3c374bd4b131b078387dd555a\
                             b5b0c7e52db50612d2b53acb478a53b4";
pub const XTS256_I2: &str = "e64219ede0e1c2a00ef5586ac49beb6f";
pub const XTS256_P2: &str = "24cb762255b5a800f46e8060569e0553\
                             bcfe86553bcad589c7541a73acc39abd\
                             53c40776d8e822619ea9ad77a0134cfc";
pub const XTS256_C2: &str = "a3c6f3f382795b1087d70250db2cd3b1\
                             a162a8b6dc126061c10a84a5853f3a89\
                             e66cdbb79ab4289bc3ead810e9c0af92";

/// Longest unit of the XTS round-trip sweep.
pub const XTS_SWEEP_MAX: usize = 1024;
