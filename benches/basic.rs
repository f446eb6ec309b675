use cdc_link::port::MockCdcPort;
use cdc_link::session::{DeviceSession, TransferStatus};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

pub fn bench_write_transfer(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let payload = vec![0xA5u8; 64];

    c.bench_function("mock_write_transfer", |b| {
        b.to_async(&rt).iter(|| async {
            let mock = MockCdcPort::new("BENCH0");
            let mut session = DeviceSession::from_port(Box::new(mock));
            session.start_write(black_box(&payload)).unwrap();
            loop {
                match session.poll_write().unwrap() {
                    TransferStatus::Complete(n) => break black_box(n),
                    TransferStatus::Pending => tokio::task::yield_now().await,
                }
            }
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .warm_up_time(Duration::from_millis(300))
        .measurement_time(Duration::from_secs(2));
    targets = bench_write_transfer
}
criterion_main!(benches);
