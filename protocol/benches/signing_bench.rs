// Authorization benchmarks.
//
// Covers entry digest computation, entry signing and verification, the
// air-gapped request path, and envelope assembly with growing entry counts.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use authgap_protocol::address::Principal;
use authgap_protocol::auth::{create_unsigned_entry, digest_for_signing, sign, verify_signature};
use authgap_protocol::config::Network;
use authgap_protocol::crypto::Keypair;
use authgap_protocol::invocation::InvocationNode;
use authgap_protocol::ledger::{
    assemble_footprint, attach_resources, instance_key, ResourceEstimate,
};
use authgap_protocol::signing::{
    prepare_request, AirGappedSigner, PayloadFormat, SigningInstruction,
};
use authgap_protocol::transaction::TransactionBuilder;
use authgap_protocol::value::Value;

fn token() -> Principal {
    Principal::Contract([2u8; 32])
}

fn transfer(from: Principal) -> InvocationNode {
    InvocationNode::leaf(
        token(),
        "transfer",
        vec![
            Value::Address(from),
            Value::Address(Principal::Account([9u8; 32])),
            Value::I128(1_000_000),
        ],
    )
    .unwrap()
}

fn bench_entry_digest(c: &mut Criterion) {
    let kp = Keypair::generate();
    let entry = create_unsigned_entry(kp.principal(), transfer(kp.principal()), 1_000);
    let network = Network::testnet();

    c.bench_function("auth/entry_digest", |b| {
        b.iter(|| digest_for_signing(&entry, &network).unwrap());
    });
}

fn bench_sign_entry(c: &mut Criterion) {
    let kp = Keypair::generate();
    let entry = create_unsigned_entry(kp.principal(), transfer(kp.principal()), 1_000);
    let network = Network::testnet();

    c.bench_function("auth/sign_entry", |b| {
        b.iter(|| sign(&entry, &kp, &network).unwrap());
    });
}

fn bench_verify_entry(c: &mut Criterion) {
    let kp = Keypair::generate();
    let network = Network::testnet();
    let entry = create_unsigned_entry(kp.principal(), transfer(kp.principal()), 1_000);
    let signed = sign(&entry, &kp, &network).unwrap();

    c.bench_function("auth/verify_entry", |b| {
        b.iter(|| verify_signature(&signed, &network).unwrap());
    });
}

fn bench_air_gapped_request(c: &mut Criterion) {
    let mut group = c.benchmark_group("signing/air_gapped");
    let network = Network::testnet();

    for format in [PayloadFormat::Raw, PayloadFormat::Xdr] {
        let kp = Keypair::generate();
        let me = kp.principal();
        let pending = vec![create_unsigned_entry(me, transfer(me), 1_000)];
        let request = prepare_request(&network, &pending, format).unwrap().request;
        let instruction = SigningInstruction::new(&transfer(me));
        let signer = AirGappedSigner::new(kp, network.clone(), vec![token()]);

        group.bench_function(format.to_string(), |b| {
            b.iter(|| signer.sign_request(&instruction, &request).unwrap());
        });
    }

    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction/assemble");
    let network = Network::testnet();
    let source = Keypair::generate();

    for size in [1, 5, 20] {
        let signers: Vec<Keypair> = (0..size).map(|_| Keypair::generate()).collect();
        let root = transfer(source.principal());
        let entries: Vec<_> = signers
            .iter()
            .map(|kp| {
                let entry = create_unsigned_entry(kp.principal(), root.clone(), 1_000);
                sign(&entry, kp, &network).unwrap()
            })
            .collect();
        let fp = assemble_footprint(vec![instance_key(token()).unwrap()], Vec::new())
            .unwrap()
            .with_nonce_keys(&entries)
            .unwrap();
        let resourced = attach_resources(fp, ResourceEstimate::manual(1_000_000, 512, 512, 10_000));

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| {
                TransactionBuilder::new(source.principal(), network.clone())
                    .current_sequence(1)
                    .footprint(resourced.clone())
                    .invoke(root.clone())
                    .auth(entries.clone())
                    .assemble(&source)
                    .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_entry_digest,
    bench_sign_entry,
    bench_verify_entry,
    bench_air_gapped_request,
    bench_assemble,
);
criterion_main!(benches);
