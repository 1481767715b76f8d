use chrono::NaiveDate;
use install_schedule::{
    Category, ConvertError, ConverterConfig, Project, ProjectMetadata, ScheduleNormalizer,
    SheetTable, TaskOrigin, TaskRecord, tasks_from_csv_str, tasks_to_csv_string,
};

const PRIMARY_HEADERS: [&str; 5] = ["School", "Status", "Trustee Zone", "Installation Date", "Notes"];

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn normalizer() -> ScheduleNormalizer {
    ScheduleNormalizer::new(ConverterConfig::default(), d(2025, 3, 10))
}

fn primary(rows: &[&[&str]]) -> SheetTable {
    SheetTable::from_rows("Project status", &PRIMARY_HEADERS, rows)
}

fn issues(rows: &[&[&str]]) -> SheetTable {
    SheetTable::from_rows("school with issues", &["School", "Issue", "Status"], rows)
}

fn revisits(rows: &[&[&str]]) -> SheetTable {
    SheetTable::from_rows(
        "Schools to be revisted",
        &["School", "Reason", "Status", "Assigned To"],
        rows,
    )
}

fn named<'a>(tasks: &'a [TaskRecord], name: &str) -> &'a TaskRecord {
    tasks
        .iter()
        .find(|t| t.name == name)
        .unwrap_or_else(|| panic!("no task named {name}"))
}

fn assert_strictly_sequential<'a>(tasks: impl Iterator<Item = &'a TaskRecord>) {
    let tasks: Vec<&TaskRecord> = tasks.collect();
    for pair in tasks.windows(2) {
        assert!(
            pair[1].start > pair[0].start && pair[1].start >= pair[0].finish,
            "{} [{}..{}] overlaps {} [{}..{}]",
            pair[1].name,
            pair[1].start,
            pair[1].finish,
            pair[0].name,
            pair[0].start,
            pair[0].finish
        );
    }
}

#[test]
fn three_undated_entities_yield_eleven_sequential_tasks() {
    let sheet = primary(&[
        &["School A", "", "1", "", ""],
        &["School B", "not started", "1", "", ""],
        &["School C", "", "2", "", ""],
    ]);
    let conversion = normalizer().convert(&sheet, None, None).unwrap();

    assert_eq!(conversion.tasks.len(), 11);
    let categories: Vec<Category> = conversion.tasks.iter().map(|t| t.category).collect();
    assert_eq!(
        categories,
        vec![
            Category::Planning,
            Category::Planning,
            Category::Planning,
            Category::Delivery,
            Category::Installation,
            Category::Delivery,
            Category::Installation,
            Category::Delivery,
            Category::Installation,
            Category::Closeout,
            Category::Closeout,
        ]
    );
    assert_eq!(conversion.cursor_tasks().count(), 6);
    assert_strictly_sequential(conversion.cursor_tasks());
    assert!(conversion.overlapping_pairs().is_empty());
    assert!(!conversion.report.issues_sheet_present);
    assert!(!conversion.report.revisits_sheet_present);
}

#[test]
fn planning_seed_is_anchored_before_reference_date() {
    let conversion = normalizer().convert(&primary(&[]), None, None).unwrap();
    let planning: Vec<&TaskRecord> = conversion
        .tasks
        .iter()
        .filter(|t| t.category == Category::Planning)
        .collect();
    assert_eq!(planning.len(), 3);
    assert_eq!(planning[0].start, d(2025, 3, 5));
    assert_eq!(planning[0].completion_pct, 100);
    assert_eq!(planning[1].start, planning[0].finish);
    assert_eq!(planning[1].resource, "Technical Team");
    assert_eq!(planning[2].finish, d(2025, 3, 11));
    assert_eq!(conversion.report.final_cursor, d(2025, 3, 11));

    let documentation = named(&conversion.tasks, "Final Documentation");
    let review = named(&conversion.tasks, "Project Review");
    assert_eq!(documentation.start, d(2025, 3, 14));
    assert_eq!(review.start, d(2025, 3, 15));
}

#[test]
fn cursor_pairs_start_one_day_after_cursor() {
    let conversion = normalizer()
        .convert(&primary(&[&["School A", "", "1", "", "Rack on wall"]]), None, None)
        .unwrap();
    let delivery = named(&conversion.tasks, "Zone 1 - School A: Delivery");
    let installation = named(&conversion.tasks, "Zone 1 - School A: Installation");

    assert_eq!(delivery.start, d(2025, 3, 12));
    assert_eq!(delivery.finish, d(2025, 3, 13));
    assert_eq!(installation.start, delivery.finish);
    assert_eq!(installation.finish, d(2025, 3, 14));
    assert_eq!(delivery.zone, installation.zone);
    assert_eq!(delivery.notes, "Rack on wall");
    assert_eq!(installation.notes, delivery.notes);
    assert_eq!(delivery.resource, "Delivery Team");
    assert_eq!(installation.resource, "Installation Team");
    assert_eq!(conversion.report.final_cursor, d(2025, 3, 14));
}

#[test]
fn status_maps_to_completion() {
    let sheet = primary(&[
        &["Done PS", "DONE", "", "2025-04-01", ""],
        &["Started PS", "started", "", "2025-04-02", ""],
        &["Pending PS", "pending", "", "2025-04-03", ""],
        &["Blank PS", "", "", "2025-04-04", ""],
    ]);
    let tasks = normalizer().convert(&sheet, None, None).unwrap().into_tasks();

    assert_eq!(named(&tasks, "Done PS: Delivery").completion_pct, 100);
    assert_eq!(named(&tasks, "Done PS: Installation").completion_pct, 100);
    assert_eq!(named(&tasks, "Started PS: Installation").completion_pct, 50);
    assert_eq!(named(&tasks, "Pending PS: Installation").completion_pct, 0);
    assert_eq!(named(&tasks, "Blank PS: Delivery").completion_pct, 0);
}

#[test]
fn section_header_rows_are_skipped() {
    let sheet = primary(&[
        &["ELEMENTARY SCHOOLS", "", "", "", ""],
        &["Arch St. PS", "", "1", "", ""],
        &[" secondary schools ", "done", "2", "2025-04-01", ""],
    ]);
    let conversion = normalizer().convert(&sheet, None, None).unwrap();

    let derived: Vec<&TaskRecord> = conversion
        .tasks
        .iter()
        .filter(|t| matches!(t.category, Category::Delivery | Category::Installation))
        .collect();
    assert_eq!(derived.len(), 2);
    assert!(derived.iter().all(|t| t.name.contains("Arch St. PS")));
    assert!(!conversion.tasks.iter().any(|t| t.name.to_uppercase().contains("SCHOOLS:")));
    assert_eq!(conversion.report.skipped_header_rows, 2);
}

#[test]
fn blank_entity_rows_are_skipped() {
    let sheet = primary(&[&["", "done", "1", "", ""], &["nan", "", "", "", ""]]);
    let conversion = normalizer().convert(&sheet, None, None).unwrap();
    assert_eq!(conversion.tasks.len(), 5);
    assert_eq!(conversion.report.skipped_blank_rows, 2);
}

#[test]
fn in_progress_rows_without_date_are_not_rescheduled() {
    let sheet = primary(&[
        &["Half PS", "started", "1", "", ""],
        &["Finished PS", "done", "1", "", ""],
        &["Fresh PS", "", "1", "", ""],
    ]);
    let conversion = normalizer().convert(&sheet, None, None).unwrap();

    assert_eq!(conversion.report.skipped_in_progress_rows, 2);
    assert_eq!(conversion.report.cursor_rows, 1);
    assert!(!conversion.tasks.iter().any(|t| t.name.contains("Half PS")));
    // The skipped rows leave the cursor where it was.
    assert_eq!(named(&conversion.tasks, "Zone 1 - Fresh PS: Delivery").start, d(2025, 3, 12));
}

#[test]
fn dated_rows_use_target_date_and_leave_cursor_alone() {
    let sheet = primary(&[
        &["Dated PS", "", "2", "2025-04-01", ""],
        &["Undated PS", "", "2", "", ""],
    ]);
    let conversion = normalizer().convert(&sheet, None, None).unwrap();

    let delivery = named(&conversion.tasks, "Zone 2 - Dated PS: Delivery");
    let installation = named(&conversion.tasks, "Zone 2 - Dated PS: Installation");
    assert_eq!(delivery.start, d(2025, 3, 31));
    assert_eq!(delivery.finish, d(2025, 4, 1));
    assert_eq!(installation.start, d(2025, 4, 1));
    assert_eq!(installation.finish, d(2025, 4, 2));

    let undated = named(&conversion.tasks, "Zone 2 - Undated PS: Delivery");
    assert_eq!(undated.start, d(2025, 3, 12));
    assert_eq!(conversion.report.dated_rows, 1);
    assert_eq!(conversion.report.final_cursor, d(2025, 3, 14));
}

#[test]
fn dated_and_cursor_tasks_may_overlap() {
    let sheet = primary(&[
        &["Dated PS", "", "", "03/13/2025", ""],
        &["Undated PS", "", "", "", ""],
    ]);
    let conversion = normalizer().convert(&sheet, None, None).unwrap();

    let pairs = conversion.overlapping_pairs();
    assert!(!pairs.is_empty());
    for (dated, placed) in pairs {
        assert_eq!(conversion.origins[dated], TaskOrigin::Dated);
        assert_eq!(conversion.origins[placed], TaskOrigin::Cursor);
    }
    assert_eq!(
        named(&conversion.tasks, "Dated PS: Delivery").start,
        named(&conversion.tasks, "Undated PS: Delivery").start
    );
}

#[test]
fn unusable_zone_becomes_zero() {
    let sheet = primary(&[&["Odd PS", "", "zone four", "", ""], &["Neg PS", "", "-2", "", ""]]);
    let tasks = normalizer().convert(&sheet, None, None).unwrap().into_tasks();
    assert_eq!(named(&tasks, "Odd PS: Delivery").zone, 0);
    assert_eq!(named(&tasks, "Neg PS: Installation").zone, 0);
}

#[test]
fn issue_rows_follow_cursor_and_inherit_zone() {
    let sheet = primary(&[
        &["Arch St. PS", "", "3", "", ""],
        &["Arch St. PS", "", "5", "", ""],
    ]);
    let issue_sheet = issues(&[
        &["Arch St. PS", "Wall mounted rack issue", "pending"],
        &["Unknown PS", "No power", ""],
        &["", "orphan", "done"],
    ]);
    let conversion = normalizer().convert(&sheet, Some(&issue_sheet), None).unwrap();

    assert!(conversion.report.issues_sheet_present);
    assert_eq!(conversion.report.issue_rows, 2);

    let known = named(&conversion.tasks, "School with Issues - Arch St. PS");
    assert_eq!(known.zone, 3);
    assert_eq!(known.completion_pct, 30);
    assert_eq!(known.notes, "Wall mounted rack issue");
    assert_eq!(known.resource, "Specialized Team");
    assert_eq!(known.duration, 2);
    // Two cursor pairs end on 03-17; the issue starts the day after.
    assert_eq!(known.start, d(2025, 3, 18));
    assert_eq!(known.finish, d(2025, 3, 20));

    let unknown = named(&conversion.tasks, "School with Issues - Unknown PS");
    assert_eq!(unknown.zone, 0);
    assert_eq!(unknown.completion_pct, 0);
    assert_eq!(unknown.start, d(2025, 3, 21));
}

#[test]
fn revisit_rows_use_assignee_or_default_team() {
    let sheet = primary(&[&["Dunlop PS", "done", "3", "2025-02-01", ""]]);
    let revisit_sheet = revisits(&[
        &["Dunlop PS", "Faulty UPS replacement", "completed", "J. Rivera"],
        &["Elm PS", "Battery alarm", "booked", ""],
    ]);
    let conversion = normalizer()
        .convert(&sheet, None, Some(&revisit_sheet))
        .unwrap();

    assert!(!conversion.report.issues_sheet_present);
    assert!(conversion.report.revisits_sheet_present);

    let dunlop = named(&conversion.tasks, "School for Revisit - Dunlop PS");
    assert_eq!(dunlop.resource, "J. Rivera");
    assert_eq!(dunlop.completion_pct, 100);
    assert_eq!(dunlop.zone, 3);
    assert_eq!(dunlop.duration, 1);
    assert_eq!(dunlop.start, d(2025, 3, 12));

    let elm = named(&conversion.tasks, "School for Revisit - Elm PS");
    assert_eq!(elm.resource, "Maintenance Team");
    assert_eq!(elm.completion_pct, 50);
    assert_eq!(elm.start, dunlop.finish + chrono::Duration::days(1));
}

#[test]
fn cursor_is_monotonic_across_all_sections() {
    let sheet = primary(&[
        &["A PS", "", "1", "", ""],
        &["B PS", "", "2", "", ""],
    ]);
    let issue_sheet = issues(&[&["A PS", "rack", "pending"], &["B PS", "power", "resolved"]]);
    let revisit_sheet = revisits(&[&["B PS", "alarm", "", ""]]);
    let conversion = normalizer()
        .convert(&sheet, Some(&issue_sheet), Some(&revisit_sheet))
        .unwrap();

    assert_eq!(conversion.cursor_tasks().count(), 7);
    assert_strictly_sequential(conversion.cursor_tasks());
    let last = conversion.cursor_tasks().last().unwrap();
    assert_eq!(conversion.report.final_cursor, last.finish);

    let documentation = named(&conversion.tasks, "Final Documentation");
    assert_eq!(
        documentation.start,
        conversion.report.final_cursor + chrono::Duration::days(3)
    );
}

#[test]
fn output_keeps_insertion_order() {
    let sheet = primary(&[
        &["Late PS", "", "", "2025-06-01", ""],
        &["Early PS", "", "", "", ""],
    ]);
    let tasks = normalizer().convert(&sheet, None, None).unwrap().into_tasks();
    assert_eq!(tasks[3].name, "Late PS: Delivery");
    assert_eq!(tasks[5].name, "Early PS: Delivery");
    assert!(tasks[3].start > tasks[5].start);
}

#[test]
fn invalid_target_date_fails_whole_conversion() {
    let sheet = primary(&[
        &["Good PS", "", "", "2025-04-01", ""],
        &["Bad PS", "", "", "sometime in May", ""],
    ]);
    let err = normalizer().convert(&sheet, None, None).unwrap_err();
    assert_eq!(
        err,
        ConvertError::InvalidDate {
            sheet: "Project status".into(),
            row: 2,
            column: "Installation Date".into(),
            value: "sometime in May".into(),
        }
    );
    assert!(err.to_string().contains("Installation Date"));
}

#[test]
fn missing_status_column_is_reported() {
    let sheet = SheetTable::from_rows("Project status", &["School", "Zone"], &[&["A PS", "1"]]);
    let err = normalizer().convert(&sheet, None, None).unwrap_err();
    assert_eq!(
        err,
        ConvertError::MissingColumn {
            sheet: "Project status".into(),
            column: "Status".into(),
        }
    );
}

#[test]
fn custom_config_changes_fixed_durations() {
    let mut config = ConverterConfig::default();
    config.issue_duration_days = 4;
    config.planning.truncate(1);
    config.planning_lead_days = 0;
    let normalizer = ScheduleNormalizer::new(config, d(2025, 3, 10));

    let conversion = normalizer
        .convert(&primary(&[]), Some(&issues(&[&["A PS", "rack", ""]])), None)
        .unwrap();
    let issue = named(&conversion.tasks, "School with Issues - A PS");
    assert_eq!(issue.start, d(2025, 3, 13));
    assert_eq!(issue.finish, d(2025, 3, 17));
}

#[test]
fn target_at_calendar_edge_is_an_error() {
    let last_day = NaiveDate::MAX.to_string();
    let sheet = primary(&[&["Edge PS", "", "", last_day.as_str(), ""]]);
    let err = normalizer().convert(&sheet, None, None).unwrap_err();
    assert_eq!(
        err,
        ConvertError::DateOutOfRange {
            task: "Edge PS: Installation".into(),
        }
    );
    assert!(err.to_string().contains("outside the supported calendar"));
}

#[test]
fn oversized_config_offsets_are_errors() {
    let mut config = ConverterConfig::default();
    config.planning_lead_days = i64::MAX;
    let err = ScheduleNormalizer::new(config, d(2025, 3, 10))
        .convert(&primary(&[]), None, None)
        .unwrap_err();
    assert!(matches!(err, ConvertError::DateOutOfRange { .. }));

    let mut config = ConverterConfig::default();
    config.issue_duration_days = 99_999_999_999_999;
    let err = ScheduleNormalizer::new(config, d(2025, 3, 10))
        .convert(&primary(&[]), Some(&issues(&[&["A PS", "rack", ""]])), None)
        .unwrap_err();
    assert_eq!(
        err,
        ConvertError::DateOutOfRange {
            task: "School with Issues - A PS".into(),
        }
    );
}

#[test]
fn large_zone_survives_table_and_csv() {
    let sheet = primary(&[&["Far PS", "", "3000000000", "", ""]]);
    let tasks = normalizer().convert(&sheet, None, None).unwrap().into_tasks();
    let delivery = named(&tasks, "Zone 3000000000 - Far PS: Delivery");
    assert_eq!(delivery.zone, 3_000_000_000);

    let project = Project::with_tasks(ProjectMetadata::default(), tasks.clone()).unwrap();
    assert_eq!(project.tasks().unwrap(), tasks);

    let text = tasks_to_csv_string(&tasks).unwrap();
    assert_eq!(tasks_from_csv_str(&text).unwrap(), tasks);
}

#[test]
fn site_named_none_is_scheduled() {
    let sheet = primary(&[&["None", "", "2", "", ""], &["nan", "", "", "", ""]]);
    let tasks = normalizer().convert(&sheet, None, None).unwrap().into_tasks();
    assert_eq!(tasks.len(), 7);
    named(&tasks, "Zone 2 - None: Delivery");
}
