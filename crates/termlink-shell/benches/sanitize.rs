use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use termlink_shell::{sanitize, LineAccumulator};

/// A colored `ls -l` style listing with a prompt at the end.
fn create_listing(lines: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..lines {
        out.extend_from_slice(
            format!(
                "-rw-r--r--  1 user staff  {i:>6} Jan  1 12:00 \x1b[01;32mfile_{i}.rs\x1b[0m\r\n"
            )
            .as_bytes(),
        );
    }
    out.extend_from_slice(b"\x1b]0;user@host: ~/src\x07\x1b[?2004huser@host:~/src$ ");
    out
}

/// A progress bar redrawn in place, finished by a newline.
fn create_progress(steps: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..=steps {
        out.extend_from_slice(format!("\r\x1b[2KDownloading [{:<50}] {:>3}%", "#".repeat(i * 50 / steps), i * 100 / steps).as_bytes());
    }
    out.push(b'\n');
    out
}

fn bench_sanitize_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize_line");

    let cases = [
        ("plain", "total 42 drwxr-xr-x  2 user staff   64 Jan  1 12:00 src".to_string()),
        ("colored", "\x1b[1;31mERROR\x1b[0m: \x1b[33mbuild failed\x1b[0m in \x1b[4msrc/main.rs\x1b[24m".to_string()),
        ("progress", "10%\r20%\r30%\r40%\r50%\r60%\r70%\r80%\r90%\r100%".to_string()),
        ("title", "\x1b]0;user@host: ~/projects/termlink\x07user@host:~/projects/termlink$ ".to_string()),
    ];

    for (name, line) in cases.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(name), line, |b, line| {
            b.iter(|| black_box(sanitize(black_box(line))));
        });
    }

    group.finish();
}

fn bench_accumulator(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_accumulator");

    for lines in [100usize, 1_000, 10_000].iter() {
        let output = create_listing(*lines);
        group.throughput(Throughput::Bytes(output.len() as u64));
        group.bench_with_input(BenchmarkId::new("listing", lines), &output, |b, output| {
            b.iter(|| {
                let mut acc = LineAccumulator::new();
                let mut count = 0;
                for chunk in output.chunks(4096) {
                    count += acc.push(black_box(chunk)).len();
                    black_box(acc.pending());
                }
                black_box(count);
            });
        });
    }

    group.finish();
}

fn bench_progress_redraw(c: &mut Criterion) {
    let output = create_progress(200);

    c.bench_function("progress_redraw_small_reads", |b| {
        b.iter(|| {
            let mut acc = LineAccumulator::new();
            for chunk in output.chunks(64) {
                black_box(acc.push(black_box(chunk)));
                black_box(acc.pending());
            }
        });
    });
}

criterion_group!(benches, bench_sanitize_line, bench_accumulator, bench_progress_redraw);
criterion_main!(benches);
