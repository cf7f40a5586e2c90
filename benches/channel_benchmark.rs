// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

#[macro_use]
extern crate criterion;

use criterion::{BatchSize, Criterion};

use pairsign::{BackupCodec, DistributedKeyShare, EncryptedChannel};
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

fn channels() -> (EncryptedChannel, EncryptedChannel) {
    let web = StaticSecret::random_from_rng(OsRng);
    let app = StaticSecret::random_from_rng(OsRng);
    (
        EncryptedChannel::new(&PublicKey::from(&app), &web),
        EncryptedChannel::new(&PublicKey::from(&web), &app),
    )
}

fn box_roundtrip(c: &mut Criterion) {
    let (web, app) = channels();
    // Roughly the size of a signer message in the middle rounds.
    let payload = vec![0x5au8; 4096];

    c.bench_function("seal 4 KiB", |b| b.iter(|| web.encrypt(&payload).unwrap()));

    let sealed = web.encrypt(&payload).unwrap();
    c.bench_function("open 4 KiB", |b| {
        b.iter(|| app.decrypt(&sealed.ciphertext, &sealed.nonce).unwrap())
    });

    c.bench_function("derive channel", |b| {
        b.iter_batched(
            || {
                (
                    StaticSecret::random_from_rng(OsRng),
                    PublicKey::from(&StaticSecret::random_from_rng(OsRng)),
                )
            },
            |(own, peer)| EncryptedChannel::new(&peer, &own),
            BatchSize::SmallInput,
        )
    });
}

fn backup_decode(c: &mut Criterion) {
    let codec = BackupCodec::random();
    let share = DistributedKeyShare {
        public_key: "02".repeat(33),
        key_share_data: serde_json::json!({ "x_i": "ab".repeat(32), "paillier": "cd".repeat(512) }),
    };
    let blob = codec.encode(&share).unwrap();
    c.bench_function("decode backup", |b| b.iter(|| codec.decode(&blob).unwrap()));
}

criterion_group!(channel_benches, box_roundtrip, backup_decode);
criterion_main!(channel_benches);
