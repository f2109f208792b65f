use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use fightpool::enrich::Enricher;
use fightpool::error::{ErrorKind, LookupError};
use fightpool::fighter::{FactField, FieldSet, FightRecord, FighterFact, Flag};
use fightpool::fighter_resolver::{FighterResolver, FighterSource};
use fightpool::import::{ImportRow, import_rows};
use fightpool::model::{Match, Multiplier, OddsProvenance, Side};
use fightpool::odds_fetch::{OddsQuote, OddsSource};
use fightpool::odds_resolver::{OddsOutcome, OddsResolver, set_manual_odds};

fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("decimal")
}

fn record_fact(wins: u32, losses: u32) -> FighterFact {
    FighterFact {
        record: Some(FightRecord::new(wins, losses, 0)),
        ..Default::default()
    }
}

#[derive(Clone, Default)]
struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    fn push(&self, name: &str) {
        self.0.lock().expect("calls lock").push(name.to_string());
    }

    fn names(&self) -> Vec<String> {
        self.0.lock().expect("calls lock").clone()
    }
}

struct FakeSource {
    name: &'static str,
    provides: FieldSet,
    answers: HashMap<String, FighterFact>,
    fail_marker: Option<&'static str>,
    calls: Calls,
}

impl FakeSource {
    fn new(name: &'static str, provides: FieldSet) -> Self {
        Self {
            name,
            provides,
            answers: HashMap::new(),
            fail_marker: None,
            calls: Calls::default(),
        }
    }

    fn answer(mut self, fighter: &str, fact: FighterFact) -> Self {
        self.answers.insert(fighter.to_string(), fact);
        self
    }

    fn failing_on(mut self, marker: &'static str) -> Self {
        self.fail_marker = Some(marker);
        self
    }

    fn calls(&self) -> Calls {
        self.calls.clone()
    }
}

impl FighterSource for FakeSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn provides(&self) -> FieldSet {
        self.provides
    }

    fn lookup(&self, name: &str, _wanted: FieldSet) -> Result<FighterFact, LookupError> {
        self.calls.push(name);
        if self.fail_marker.is_some_and(|marker| name.contains(marker)) {
            return Err(LookupError::network("connection reset"));
        }
        self.answers
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::not_found(format!("no entry for {name}")))
    }
}

struct CountingOdds {
    calls: Arc<AtomicUsize>,
    quote: Option<(Decimal, Decimal)>,
}

impl CountingOdds {
    fn new(quote: Option<(&str, &str)>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = Self {
            calls: Arc::clone(&calls),
            quote: quote.map(|(a, b)| (dec(a), dec(b))),
        };
        (source, calls)
    }
}

impl OddsSource for CountingOdds {
    fn lookup(&self, _fighter_a: &str, _fighter_b: &str) -> Result<OddsQuote, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.quote
            .map(|(odds_a, odds_b)| OddsQuote {
                odds_a,
                odds_b,
                provider: "Test Book".to_string(),
            })
            .ok_or_else(|| LookupError::not_found("no event"))
    }
}

fn enricher(sources: Vec<Box<dyn FighterSource>>, odds: CountingOdds) -> Enricher {
    Enricher::new(
        FighterResolver::with_sources(sources),
        OddsResolver::with_source(Box::new(odds)),
        2,
    )
}

#[test]
fn primary_nationality_survives_and_fallback_fills_image() {
    let primary = FakeSource::new("roster", FieldSet::all()).answer(
        "Rico Verhoeven",
        FighterFact {
            nationality: Some("Netherlands".into()),
            flag: Flag::Code("NL".into()),
            ..Default::default()
        },
    );
    let fallback = FakeSource::new(
        "wikidata",
        FieldSet::of(&[FactField::Image, FactField::Nationality, FactField::Flag]),
    )
    .answer(
        "Rico Verhoeven",
        FighterFact {
            image_url: Some("https://img.test/rico.png".into()),
            nationality: Some("Belgium".into()),
            flag: Flag::Code("BE".into()),
            ..Default::default()
        },
    );
    let resolver = FighterResolver::with_sources(vec![Box::new(primary), Box::new(fallback)]);

    let res = resolver.resolve("Rico Verhoeven", &FighterFact::default(), false);
    assert!(res.found);
    assert_eq!(res.fact.nationality.as_deref(), Some("Netherlands"));
    assert_eq!(res.fact.flag, Flag::Code("NL".into()));
    assert_eq!(res.fact.image_url.as_deref(), Some("https://img.test/rico.png"));
}

#[test]
fn abbreviated_name_is_replaced_and_used_for_later_sources() {
    let primary = FakeSource::new("roster", FieldSet::all()).answer(
        "A. Bouzid",
        FighterFact {
            full_name: Some("Ayoub Bouzid".into()),
            ..record_fact(30, 8)
        },
    );
    let secondary = FakeSource::new("wikipedia", FieldSet::of(&[FactField::Image]))
        .answer("Ayoub Bouzid", FighterFact {
            image_url: Some("https://img.test/bouzid.png".into()),
            ..Default::default()
        });
    let secondary_calls = secondary.calls();
    let resolver = FighterResolver::with_sources(vec![Box::new(primary), Box::new(secondary)]);

    let res = resolver.resolve("A. Bouzid", &FighterFact::default(), false);
    assert!(res.found);
    assert_eq!(res.display_name, "Ayoub Bouzid");
    assert_eq!(secondary_calls.names(), ["Ayoub Bouzid"]);
    assert_eq!(res.fact.image_url.as_deref(), Some("https://img.test/bouzid.png"));
}

#[test]
fn full_names_are_never_renamed() {
    let primary = FakeSource::new("roster", FieldSet::all()).answer(
        "Ayoub Bouzid",
        FighterFact {
            full_name: Some("Ayoub Bouzid El Amrani".into()),
            ..record_fact(30, 8)
        },
    );
    let resolver = FighterResolver::with_sources(vec![Box::new(primary)]);
    let res = resolver.resolve("Ayoub Bouzid", &FighterFact::default(), false);
    assert_eq!(res.display_name, "Ayoub Bouzid");
}

#[test]
fn failing_source_is_recorded_and_the_next_one_still_runs() {
    let primary = FakeSource::new("roster", FieldSet::all()).failing_on("Rico");
    let fallback =
        FakeSource::new("wikipedia", FieldSet::all()).answer("Rico Verhoeven", record_fact(66, 10));
    let resolver = FighterResolver::with_sources(vec![Box::new(primary), Box::new(fallback)]);

    let res = resolver.resolve("Rico Verhoeven", &FighterFact::default(), false);
    assert!(res.found);
    assert_eq!(res.fact.record, Some(FightRecord::new(66, 10, 0)));
    assert_eq!(res.failures.len(), 1);
    assert_eq!(res.failures[0].source, "roster");
    assert_eq!(res.failures[0].kind, ErrorKind::Network);
}

#[test]
fn nothing_found_anywhere() {
    let resolver = FighterResolver::with_sources(vec![
        Box::new(FakeSource::new("roster", FieldSet::all())),
        Box::new(FakeSource::new("wikipedia", FieldSet::all())),
    ]);
    let res = resolver.resolve("Nobody Known", &FighterFact::default(), false);
    assert!(!res.found);
    assert_eq!(res.fact, FighterFact::default());
    assert!(res.failures.iter().all(|f| f.kind == ErrorKind::NotFound));
    assert_eq!(res.failures.len(), 2);
}

#[test]
fn known_values_are_never_overwritten() {
    let known = FighterFact {
        nationality: Some("Suriname".into()),
        ..Default::default()
    };
    let source = FakeSource::new("roster", FieldSet::all()).answer(
        "Tariq Osaro",
        FighterFact {
            nationality: Some("Netherlands".into()),
            ..record_fact(12, 2)
        },
    );
    let resolver = FighterResolver::with_sources(vec![Box::new(source)]);
    let res = resolver.resolve("Tariq Osaro", &known, false);
    assert!(res.found);
    assert_eq!(res.fact.nationality.as_deref(), Some("Suriname"));
    assert_eq!(res.fact.record, Some(FightRecord::new(12, 2, 0)));
}

#[test]
fn manual_and_csv_odds_are_never_requested() {
    let (odds, calls) = CountingOdds::new(Some(("1.20", "4.50")));
    let resolver = OddsResolver::with_source(Box::new(odds));

    let mut manual = Match::new(1, "Rico Verhoeven", "Levi Rigters");
    set_manual_odds(&mut manual, Some(dec("1.5")), Some(dec("2.6")));
    let before = manual.clone();
    assert_eq!(resolver.resolve(&mut manual), OddsOutcome::Sticky);
    assert_eq!(manual, before);

    let mut csv = Match::new(2, "Tariq Osaro", "Sergej Maslobojev");
    csv.odds_a = Some(dec("2.0"));
    csv.odds_provenance = OddsProvenance::Csv;
    let before = csv.clone();
    assert_eq!(resolver.resolve(&mut csv), OddsOutcome::Sticky);
    assert_eq!(csv, before);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn provider_odds_are_stored_with_provenance_and_refreshed() {
    let (odds, calls) = CountingOdds::new(Some(("1.20", "4.50")));
    let resolver = OddsResolver::with_source(Box::new(odds));
    let mut m = Match::new(1, "Rico Verhoeven", "Levi Rigters");

    assert_eq!(resolver.resolve(&mut m), OddsOutcome::Updated);
    assert_eq!(m.odds_a, Some(dec("1.20")));
    assert_eq!(m.odds_b, Some(dec("4.50")));
    assert_eq!(m.odds_provenance.label(), "Test Book");
    assert!(!m.odds_provenance.is_sticky());

    assert_eq!(resolver.resolve(&mut m), OddsOutcome::Updated);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_odds_leave_the_match_untouched() {
    let (odds, _calls) = CountingOdds::new(None);
    let resolver = OddsResolver::with_source(Box::new(odds));
    let mut m = Match::new(1, "Rico Verhoeven", "Levi Rigters");
    assert_eq!(
        resolver.resolve(&mut m),
        OddsOutcome::NotFound(ErrorKind::NotFound)
    );
    assert_eq!(m.odds_a, None);
    assert_eq!(m.odds_provenance, OddsProvenance::None);
}

#[test]
fn sweep_isolates_a_failing_match() {
    let source = FakeSource::new("roster", FieldSet::all())
        .failing_on("Offline")
        .answer("Rico Verhoeven", record_fact(66, 10))
        .answer("Levi Rigters", record_fact(20, 4))
        .answer("Tariq Osaro", record_fact(12, 2))
        .answer("Sergej Maslobojev", record_fact(40, 9));
    let (odds, odds_calls) = CountingOdds::new(None);
    let enricher = enricher(vec![Box::new(source)], odds);

    let mut matches = vec![
        Match::new(1, "Rico Verhoeven", "Levi Rigters"),
        Match::new(2, "Offline Alpha", "Offline Beta"),
        Match::new(3, "Tariq Osaro", "Sergej Maslobojev"),
    ];
    let report = enricher.sweep_missing_fighter_data(&mut matches);

    assert_eq!(report.resolved, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.not_found.len(), 2);
    assert!(report.not_found.iter().all(|u| u.match_id == 2));
    assert_eq!(report.not_found[0].side, Side::A);
    assert_eq!(report.not_found[1].name, "Offline Beta");

    for m in [&matches[0], &matches[2]] {
        assert!(m.has_fighter_data(Side::A));
        assert!(m.has_fighter_data(Side::B));
    }
    assert!(!matches[1].has_fighter_data(Side::A));
    assert_eq!(odds_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn sweep_skips_matches_that_already_have_data() {
    let source = FakeSource::new("roster", FieldSet::all())
        .answer("Levi Rigters", record_fact(20, 4));
    let calls = source.calls();
    let (odds, _) = CountingOdds::new(None);
    let enricher = enricher(vec![Box::new(source)], odds);

    let mut complete = Match::new(1, "Rico Verhoeven", "Tariq Osaro");
    complete.fighter_a = record_fact(66, 10);
    complete.fighter_b.image_url = Some("https://img.test/osaro.png".into());
    let mut half = Match::new(2, "Rico Verhoeven", "Levi Rigters");
    half.fighter_a = record_fact(66, 10);

    let mut matches = vec![complete, half];
    let report = enricher.sweep_missing_fighter_data(&mut matches);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.resolved, 1);
    assert!(report.not_found.is_empty());
    assert_eq!(calls.names(), ["Levi Rigters"]);
}

#[test]
fn new_match_fills_gaps_on_both_sides_then_odds() {
    let source = FakeSource::new("roster", FieldSet::all())
        .answer(
            "Rico Verhoeven",
            FighterFact {
                image_url: Some("https://img.test/roster-rico.png".into()),
                ..record_fact(66, 10)
            },
        )
        .answer("Levi Rigters", record_fact(20, 4));
    let calls = source.calls();
    let (odds, odds_calls) = CountingOdds::new(Some(("1.45", "2.70")));
    let enricher = enricher(vec![Box::new(source)], odds);

    let mut m = Match::new(1, "Rico Verhoeven", "Levi Rigters");
    m.fighter_a.image_url = Some("https://img.test/rico.png".into());
    let report = enricher.enrich_new_match(&mut m);

    assert_eq!(calls.names(), ["Rico Verhoeven", "Levi Rigters"]);
    assert!(report.not_found.is_empty());
    assert_eq!(report.odds, Some(OddsOutcome::Updated));
    assert_eq!(m.fighter_a.image_url.as_deref(), Some("https://img.test/rico.png"));
    assert_eq!(m.fighter_a.record, Some(FightRecord::new(66, 10, 0)));
    assert_eq!(m.fighter_b.record, Some(FightRecord::new(20, 4, 0)));
    assert_eq!(m.odds_a, Some(dec("1.45")));
    assert_eq!(odds_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn edit_refetches_only_the_renamed_side() {
    let source = FakeSource::new("roster", FieldSet::all())
        .answer("Ayoub Bouzid", record_fact(30, 8));
    let calls = source.calls();
    let (odds, odds_calls) = CountingOdds::new(Some(("1.90", "1.90")));
    let enricher = enricher(vec![Box::new(source)], odds);

    let mut m = Match::new(1, "Rico Verhoeven", "Levi Rigters");
    m.fighter_a = record_fact(66, 10);
    m.fighter_b = record_fact(20, 4);

    let report =
        enricher.enrich_edited_match(&mut m, "Ayoub Bouzid", "Levi Rigters", Some(Multiplier::from(2_i64)));
    assert_eq!(calls.names(), ["Ayoub Bouzid"]);
    assert_eq!(m.participant_a, "Ayoub Bouzid");
    assert_eq!(m.fighter_a.record, Some(FightRecord::new(30, 8, 0)));
    assert_eq!(m.fighter_b.record, Some(FightRecord::new(20, 4, 0)));
    assert_eq!(m.multiplier.get(), 2);
    assert_eq!(report.odds, Some(OddsOutcome::Updated));
    assert_eq!(odds_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn edit_without_name_change_makes_no_lookups() {
    let source = FakeSource::new("roster", FieldSet::all());
    let calls = source.calls();
    let (odds, odds_calls) = CountingOdds::new(Some(("1.90", "1.90")));
    let enricher = enricher(vec![Box::new(source)], odds);

    let mut m = Match::new(1, "Rico Verhoeven", "Levi Rigters");
    let report = enricher.enrich_edited_match(&mut m, "Rico Verhoeven", " ", Some(Multiplier::from(3_i64)));
    assert!(calls.names().is_empty());
    assert_eq!(report.odds, None);
    assert_eq!(m.participant_b, "Levi Rigters");
    assert_eq!(m.multiplier.get(), 3);
    assert_eq!(odds_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn refetch_prefers_fresh_values_and_keeps_old_ones() {
    let source = FakeSource::new("roster", FieldSet::all())
        .answer("Rico Verhoeven", record_fact(67, 10))
        .answer("Levi Rigters", record_fact(21, 4));
    let (odds, odds_calls) = CountingOdds::new(None);
    let enricher = enricher(vec![Box::new(source)], odds);

    let mut m = Match::new(1, "Rico Verhoeven", "Levi Rigters");
    m.fighter_a = FighterFact {
        image_url: Some("https://img.test/rico-old.png".into()),
        ..record_fact(66, 10)
    };
    let report = enricher.refetch_fighter_data(&mut m);

    assert!(report.not_found.is_empty());
    assert_eq!(m.fighter_a.record, Some(FightRecord::new(67, 10, 0)));
    assert_eq!(m.fighter_a.image_url.as_deref(), Some("https://img.test/rico-old.png"));
    assert_eq!(m.fighter_b.record, Some(FightRecord::new(21, 4, 0)));
    assert_eq!(report.odds, None);
    assert_eq!(odds_calls.load(Ordering::SeqCst), 0);
}

fn import_row(pairs: &[(&str, &str)]) -> ImportRow {
    let record: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ImportRow::from_record(&record).expect("valid row")
}

#[test]
fn import_keeps_csv_odds_and_imported_fields() {
    let source = FakeSource::new("roster", FieldSet::all())
        .answer("Levi Rigters", record_fact(20, 4))
        .answer("Tariq Osaro", record_fact(12, 2))
        .answer("Sergej Maslobojev", record_fact(40, 9));
    let calls = source.calls();
    let (odds, odds_calls) = CountingOdds::new(Some(("2.10", "1.75")));
    let enricher = enricher(vec![Box::new(source)], odds);

    let rows = vec![
        import_row(&[
            ("Fighter A", "Rico Verhoeven"),
            ("Fighter B", "Levi Rigters"),
            ("Multiplier", "2"),
            ("Odds A", "1,45"),
            ("Odds B", "2.7"),
            ("Fighter A Record", "66-10-1"),
        ]),
        import_row(&[
            ("fighter_a", "Tariq Osaro"),
            ("fighter_b", "Sergej Maslobojev"),
        ]),
    ];

    let report = import_rows(&enricher, &rows, 7);
    let ids: Vec<u64> = report.matches.iter().map(|m| m.id).collect();
    assert_eq!(ids, [7, 8]);
    assert!(calls.names().iter().any(|n| n == "Rico Verhoeven"));

    let first = &report.matches[0];
    assert_eq!(first.odds_provenance, OddsProvenance::Csv);
    assert_eq!(first.odds_a, Some(dec("1.45")));
    assert_eq!(first.multiplier.get(), 2);
    assert_eq!(first.fighter_a.record, Some(FightRecord::new(66, 10, 1)));

    let second = &report.matches[1];
    assert_eq!(second.odds_a, Some(dec("2.10")));
    assert_eq!(second.odds_provenance.label(), "Test Book");

    assert_eq!(report.odds_fetched, 1);
    assert_eq!(odds_calls.load(Ordering::SeqCst), 1);
    assert!(report.summary().not_found.is_empty());
}

#[test]
fn imported_record_still_gets_image_and_nationality_looked_up() {
    let source = FakeSource::new("roster", FieldSet::all())
        .answer(
            "Rico Verhoeven",
            FighterFact {
                image_url: Some("https://img.test/rico.png".into()),
                nationality: Some("Netherlands".into()),
                flag: Flag::Code("NL".into()),
                ..record_fact(70, 11)
            },
        )
        .answer("Levi Rigters", record_fact(20, 4));
    let (odds, _) = CountingOdds::new(None);
    let enricher = enricher(vec![Box::new(source)], odds);

    let rows = vec![import_row(&[
        ("fighter_a", "Rico Verhoeven"),
        ("fighter_b", "Levi Rigters"),
        ("fighter_a_record", "66-10-1"),
    ])];
    let report = import_rows(&enricher, &rows, 1);

    let rico = &report.matches[0].fighter_a;
    assert_eq!(rico.record, Some(FightRecord::new(66, 10, 1)));
    assert_eq!(rico.image_url.as_deref(), Some("https://img.test/rico.png"));
    assert_eq!(rico.nationality.as_deref(), Some("Netherlands"));
    assert_eq!(rico.flag, Flag::Code("NL".into()));
}
