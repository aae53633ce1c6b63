use panel_extract::genomics::{IntervalSet, LocusInterval, MAX_POSITION};
use proptest::prelude::*;
use test_case::test_case;

#[test_case("chr1:100-200", 100, 199 ; "half open by default")]
#[test_case("[chr1:100-200]", 100, 200 ; "closed brackets")]
#[test_case("(chr1:100-200]", 101, 200 ; "open start")]
#[test_case("chr1:100", 100, 100 ; "single position")]
#[test_case("chr1:start-10", 1, 9 ; "start keyword")]
#[test_case("chr1:10-end", 10, MAX_POSITION as u64 ; "end keyword is inclusive")]
#[test_case("chr1", 1, MAX_POSITION as u64 ; "whole contig")]
#[test_case("chr1:5-chr1:8", 5, 7 ; "repeated contig")]
#[test_case(" chr1:100-200 ", 100, 199 ; "surrounding whitespace")]
fn parses_interval_forms(text: &str, first: u64, last: u64) {
    let interval = LocusInterval::parse(text).expect("interval parses");
    assert_eq!(interval.contig, "chr1");
    assert_eq!(interval.first_position(), first);
    assert_eq!(interval.last_position(), last);
}

#[test_case("" ; "empty")]
#[test_case(":1-2" ; "missing contig")]
#[test_case("chr1:0-10" ; "zero position")]
#[test_case("chr1:10-5" ; "reversed")]
#[test_case("chr1:10-10" ; "empty half open")]
#[test_case("chr1:1-chr2:5" ; "cross contig")]
#[test_case("[chr1:1-5" ; "unbalanced bracket")]
#[test_case("[chr1]" ; "bracketed contig")]
#[test_case("chr1:x-5" ; "non numeric")]
fn rejects_malformed_intervals(text: &str) {
    assert!(LocusInterval::parse(text).is_err(), "{text:?} should not parse");
}

fn interval_strategy() -> impl Strategy<Value = LocusInterval> {
    (
        prop_oneof![Just("chr1"), Just("chr2")],
        1u32..500,
        1u32..200,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_filter_map("non-empty interval", |(contig, start, len, inc_start, inc_end)| {
            LocusInterval::new(contig, start, start + len, inc_start, inc_end).ok()
        })
}

proptest! {
    #[test]
    fn union_membership_matches_members(
        intervals in proptest::collection::vec(interval_strategy(), 0..8),
        contig in prop_oneof![Just("chr1"), Just("chr2"), Just("chr3")],
        position in 1u32..800,
    ) {
        let set = IntervalSet::new(&intervals);
        let expected: Vec<usize> = intervals
            .iter()
            .enumerate()
            .filter(|(_, iv)| iv.contains(contig, position))
            .map(|(idx, _)| idx)
            .collect();

        prop_assert_eq!(set.contains(contig, position), !expected.is_empty());
        prop_assert_eq!(set.matching(contig, position), expected);
    }

    #[test]
    fn display_form_parses_back(interval in interval_strategy()) {
        let reparsed = LocusInterval::parse(&interval.to_string()).expect("canonical form parses");
        prop_assert_eq!(reparsed.first_position(), interval.first_position());
        prop_assert_eq!(reparsed.last_position(), interval.last_position());
    }
}
