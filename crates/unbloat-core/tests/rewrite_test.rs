mod common;

use common::{bzip2, names, numbered_log, read_tar_gz, tar_bytes, tar_gz, xz, Entry};
use std::io::{Cursor, Read};
use unbloat_core::{list_members, Codec, ErrorKind, MemberKind, RewriteConfig, Rewriter};

#[test]
fn scenario_a_drops_excluded_and_nested_archives_and_tails_logs() {
    let log = numbered_log(1000);
    let source = tar_gz(&[
        Entry::File("debug.log", &log),
        Entry::File("core.dump.gz", b"\x1f\x8b\x08\x00not really gzip"),
        Entry::File("readme.txt", b"hello"),
    ]);
    let rewriter =
        Rewriter::new(RewriteConfig::default().with_exclusions(["readme.txt"])).unwrap();

    let result = rewriter.rewrite_bytes(&source).unwrap();
    let members = read_tar_gz(&result.output);

    assert_eq!(names(&members), vec!["debug.log"]);
    let text = String::from_utf8(members[0].1.clone()).unwrap();
    let kept: Vec<&str> = text.lines().collect();
    let original = String::from_utf8(log).unwrap();
    let expected: Vec<&str> = original.lines().skip(500).collect();
    assert_eq!(kept.len(), 500);
    assert_eq!(kept, expected);

    assert_eq!(result.report.members.kept, 1);
    assert_eq!(result.report.members.excluded, 1);
    assert_eq!(result.report.members.nested_archives, 1);
    assert_eq!(result.report.members.truncated, 1);
}

#[test]
fn scenario_b_binary_log_passes_through_with_warning() {
    let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let source = tar_gz(&[Entry::File("app.log", &binary)]);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();
    let members = read_tar_gz(&result.output);

    assert_eq!(members, vec![("app.log".to_string(), binary)]);
    assert_eq!(result.report.warnings.len(), 1);
    assert_eq!(result.report.warnings[0].member, "app.log");
    assert_eq!(result.report.warnings[0].valid_up_to, 128);
}

#[test]
fn scenario_c_plain_members_are_copied_verbatim() {
    let config = b"cluster:\n  name: c1\n".to_vec();
    let rdb: Vec<u8> = (0..50_000u32).flat_map(|i| i.to_le_bytes()).collect();
    let entries = [
        Entry::File("node1/config.yaml", &config),
        Entry::File("node1/dump.rdb", &rdb),
        Entry::File("node1/empty", b""),
    ];
    let source = tar_gz(&entries);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();
    let members = read_tar_gz(&result.output);

    assert_eq!(
        members,
        vec![
            ("node1/config.yaml".to_string(), config),
            ("node1/dump.rdb".to_string(), rdb),
            ("node1/empty".to_string(), Vec::new()),
        ]
    );
    assert!(result.report.warnings.is_empty());
}

#[test]
fn savings_is_original_minus_new() {
    let log = numbered_log(5000);
    let source = tar_gz(&[Entry::File("big.log", &log), Entry::File("a.txt", b"a")]);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();

    assert_eq!(result.sizes.original_bytes(), source.len() as u64);
    assert_eq!(result.sizes.new_bytes(), result.output.len() as u64);
    assert_eq!(
        result.sizes.savings_bytes(),
        source.len() as i64 - result.output.len() as i64
    );
    assert!(result.sizes.savings_bytes() > 0);
}

#[test]
fn savings_invariant_holds_for_plain_and_compressed_inputs() {
    let entries = [Entry::File("x", b"x")];
    for input in [tar_bytes(&entries), tar_gz(&entries)] {
        let result = Rewriter::default().rewrite_bytes(&input).unwrap();
        assert_eq!(
            result.sizes.savings_bytes(),
            result.sizes.original_bytes() as i64 - result.sizes.new_bytes() as i64
        );
    }
}

#[test]
fn member_count_matches_exclusion_algebra() {
    let entries = [
        Entry::File("a.txt", b"1"),
        Entry::File("b.gz", b"2"),
        Entry::File("c.txt", b"3"),
        Entry::File("d/e.log.gz", b"4"),
        Entry::File("f.log", b"5\n"),
    ];
    let source = tar_gz(&entries);
    // "missing.txt" is not in the archive and must not affect the count.
    let rewriter = Rewriter::new(
        RewriteConfig::default().with_exclusions(["c.txt", "missing.txt", "b.gz"]),
    )
    .unwrap();

    let result = rewriter.rewrite_bytes(&source).unwrap();
    let members = read_tar_gz(&result.output);

    // 5 inputs - 1 excluded present (c.txt) - 2 nested archives (b.gz, d/e.log.gz)
    assert_eq!(names(&members), vec!["a.txt", "f.log"]);
}

#[test]
fn rewrite_is_idempotent_on_its_own_output() {
    let log = numbered_log(800);
    let source = tar_gz(&[
        Entry::File("svc.log", &log),
        Entry::File("info.txt", b"info"),
        Entry::File("old.gz", b"zz"),
    ]);
    let rewriter = Rewriter::default();

    let first = rewriter.rewrite_bytes(&source).unwrap();
    let second = rewriter.rewrite_bytes(&first.output).unwrap();

    assert_eq!(read_tar_gz(&first.output), read_tar_gz(&second.output));
    assert_eq!(second.report.members.truncated, 0);
    assert_eq!(first.output, second.output);
}

#[test]
fn accepts_plain_and_bzip2_sources() {
    let log = numbered_log(30);
    let tar = tar_bytes(&[Entry::File("n.log", &log), Entry::File("x.bin", b"\0\x01")]);
    let rewriter = Rewriter::new(RewriteConfig::default().with_tail_lines(10)).unwrap();

    for (input, codec) in [(tar.clone(), Codec::Plain), (bzip2(&tar), Codec::Bzip2)] {
        let result = rewriter.rewrite_bytes(&input).unwrap();
        assert_eq!(result.codec, codec);
        let members = read_tar_gz(&result.output);
        assert_eq!(names(&members), vec!["n.log", "x.bin"]);
        assert_eq!(String::from_utf8_lossy(&members[0].1).lines().count(), 10);
    }
}

#[test]
fn accepts_xz_sources() {
    let log = numbered_log(40);
    let tar = tar_bytes(&[Entry::File("node1/n.log", &log), Entry::File("node1/a.txt", b"alpha")]);
    let rewriter = Rewriter::new(RewriteConfig::default().with_tail_lines(4)).unwrap();

    let result = rewriter.rewrite_bytes(&xz(&tar)).unwrap();

    assert_eq!(result.codec, Codec::Xz);
    let members = read_tar_gz(&result.output);
    assert_eq!(names(&members), vec!["node1/n.log", "node1/a.txt"]);
    assert_eq!(String::from_utf8_lossy(&members[0].1).lines().count(), 4);
}

#[test]
fn plain_tar_starting_with_bzip2_letters_stays_plain() {
    let source = tar_bytes(&[Entry::File("BZh_notes.txt", b"not compressed")]);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();

    assert_eq!(result.codec, Codec::Plain);
    assert_eq!(
        read_tar_gz(&result.output),
        vec![("BZh_notes.txt".to_string(), b"not compressed".to_vec())]
    );
}

/// Hands out one byte per read, like a slow pipe.
struct OneByteReader<R>(R);

impl<R: Read> Read for OneByteReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(1);
        self.0.read(&mut buf[..n])
    }
}

#[test]
fn slow_readers_are_detected_like_fast_ones() {
    let source = tar_gz(&[Entry::File("a.txt", b"alpha"), Entry::File("b.gz", b"zz")]);

    let out = Rewriter::default()
        .rewrite_stream(OneByteReader(Cursor::new(&source)), Vec::new())
        .unwrap();

    assert_eq!(out.codec, Codec::Gzip);
    assert_eq!(read_tar_gz(&out.writer), vec![("a.txt".to_string(), b"alpha".to_vec())]);
    assert_eq!(out.report.members.nested_archives, 1);
}

/// Serves the given bytes, then fails every read.
struct FailingReader(Cursor<Vec<u8>>);

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.0.read(buf)? {
            0 => Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "connection reset")),
            n => Ok(n),
        }
    }
}

#[test]
fn source_read_failures_are_io_errors() {
    let mut source = tar_gz(&[Entry::File("big.bin", &numbered_log(5000))]);
    source.truncate(source.len() / 2);

    let err = Rewriter::default()
        .rewrite_stream(FailingReader(Cursor::new(source)), Vec::new())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io, "{err}");
}

#[test]
fn dot_prefixed_names_are_kept_verbatim() {
    let source = tar_gz(&[
        Entry::Raw("./readme.txt", b"hello"),
        Entry::Raw("./node1/debug.log", b"a\nb\nc\n"),
        Entry::Raw("./skip.rdb", b"dump"),
    ]);
    let rewriter = Rewriter::new(
        RewriteConfig::default()
            .with_exclusions(["./skip.rdb"])
            .with_tail_lines(1),
    )
    .unwrap();

    let result = rewriter.rewrite_bytes(&source).unwrap();
    let listing = list_members(Cursor::new(&result.output)).unwrap();

    let written: Vec<&str> = listing.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(written, vec!["./readme.txt", "./node1/debug.log"]);
    assert_eq!(result.report.members.excluded, 1);
    assert_eq!(read_tar_gz(&result.output)[1].1, b"c\n");
}

#[test]
fn links_are_written_with_their_target_content() {
    let log = numbered_log(50);
    let source = tar_gz(&[
        Entry::File("node1/logs/ccs.log", &log),
        Entry::File("node1/config.yaml", b"shards: 3\n"),
        Entry::HardLink("node1/config.bak", "node1/config.yaml"),
        Entry::Symlink("node1/current.log", "logs/ccs.log"),
        Entry::Symlink("node1/missing.txt", "nowhere.txt"),
    ]);
    let rewriter = Rewriter::new(RewriteConfig::default().with_tail_lines(5)).unwrap();

    let result = rewriter.rewrite_bytes(&source).unwrap();
    let members = read_tar_gz(&result.output);

    assert_eq!(
        names(&members),
        vec!["node1/logs/ccs.log", "node1/config.yaml", "node1/config.bak", "node1/current.log"]
    );
    assert_eq!(members[2].1, b"shards: 3\n");
    assert_eq!(members[3].1, members[0].1);
    assert_eq!(String::from_utf8_lossy(&members[3].1).lines().count(), 5);
    let stats = result.report.members;
    assert_eq!(stats.links_resolved, 2);
    assert_eq!(stats.non_file, 1);
    assert_eq!(stats.truncated, 2);

    let listing = list_members(Cursor::new(&result.output)).unwrap();
    assert!(listing.members.iter().all(|m| m.kind == MemberKind::File));
}

#[cfg(feature = "zstd")]
#[test]
fn accepts_zstd_sources() {
    let tar = tar_bytes(&[Entry::File("a.txt", b"alpha")]);
    let input = zstd::stream::encode_all(std::io::Cursor::new(tar), 3).unwrap();

    let result = Rewriter::default().rewrite_bytes(&input).unwrap();

    assert_eq!(result.codec, Codec::Zstd);
    assert_eq!(read_tar_gz(&result.output), vec![("a.txt".to_string(), b"alpha".to_vec())]);
}

#[test]
fn output_listing_reports_gzip_and_retained_sizes() {
    let log = numbered_log(600);
    let source = tar_bytes(&[
        Entry::Dir("node1/"),
        Entry::File("node1/debug.log", &log),
        Entry::File("node1/info.txt", b"version: 7\n"),
    ]);
    let rewriter = Rewriter::new(RewriteConfig::default().with_tail_lines(100)).unwrap();

    let result = rewriter.rewrite_bytes(&source).unwrap();
    let listing = list_members(Cursor::new(&result.output)).unwrap();

    assert_eq!(listing.codec, Codec::Gzip);
    let tail_len = log.len() - numbered_log(500).len();
    let summary: Vec<(&str, MemberKind, u64)> = listing
        .members
        .iter()
        .map(|m| (m.name.as_str(), m.kind, m.size))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("node1/debug.log", MemberKind::File, tail_len as u64),
            ("node1/info.txt", MemberKind::File, 11),
        ]
    );
}

#[test]
fn directories_are_not_copied() {
    let source = tar_gz(&[Entry::Dir("node1/"), Entry::File("node1/a.txt", b"a")]);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();

    assert_eq!(names(&read_tar_gz(&result.output)), vec!["node1/a.txt"]);
    assert_eq!(result.report.members.non_file, 1);
    assert_eq!(result.report.members.seen, 2);
}

#[test]
fn long_member_names_round_trip() {
    let name = format!("node1/{}/supervisord.log", "deep".repeat(40));
    let source = tar_gz(&[Entry::File(&name, b"started\n")]);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();

    assert_eq!(read_tar_gz(&result.output), vec![(name, b"started\n".to_vec())]);
}

#[test]
fn empty_archive_rewrites_to_empty_archive() {
    let source = tar_gz(&[]);

    let result = Rewriter::default().rewrite_bytes(&source).unwrap();

    assert!(read_tar_gz(&result.output).is_empty());
    assert_eq!(result.report.members.seen, 0);
}

#[test]
fn invalid_sources_are_format_errors() {
    let not_tar = common::gzip(&[b'x'; 1024]);
    for input in [Vec::new(), vec![0x42; 2048], not_tar, b"short".to_vec()] {
        let err = Rewriter::default().rewrite_bytes(&input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArchiveFormat, "input {:?}: {err}", &input[..input.len().min(8)]);
    }
}

#[test]
fn member_limit_aborts_rewrite() {
    let source = tar_gz(&[Entry::File("huge.bin", &[7u8; 4096])]);
    let rewriter =
        Rewriter::new(RewriteConfig::default().with_max_member_bytes(1024)).unwrap();

    let err = rewriter.rewrite_bytes(&source).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Limit);
}

#[test]
fn stream_mode_reports_bytes_written() {
    let source = tar_gz(&[Entry::File("a.txt", b"alpha")]);

    let out = Rewriter::default()
        .rewrite_stream(std::io::Cursor::new(&source), Vec::new())
        .unwrap();

    assert_eq!(out.bytes_written, out.writer.len() as u64);
    assert_eq!(out.codec, Codec::Gzip);
    assert_eq!(read_tar_gz(&out.writer), vec![("a.txt".to_string(), b"alpha".to_vec())]);
}

#[test]
fn one_rewriter_serves_many_threads() {
    let rewriter = std::sync::Arc::new(
        Rewriter::new(RewriteConfig::default().with_tail_lines(5)).unwrap(),
    );
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let rewriter = rewriter.clone();
            std::thread::spawn(move || {
                let log = numbered_log(20 + i);
                let source = tar_gz(&[Entry::File("t.log", &log)]);
                let result = rewriter.rewrite_bytes(&source).unwrap();
                read_tar_gz(&result.output)
            })
        })
        .collect();

    for handle in handles {
        let members = handle.join().unwrap();
        assert_eq!(String::from_utf8_lossy(&members[0].1).lines().count(), 5);
    }
}
