use chrono::NaiveDate;
use install_schedule::{
    Category, ConverterConfig, PersistenceError, Project, ProjectMetadata, ScheduleNormalizer,
    SheetTable, TaskRecord, load_project_from_csv, load_project_from_json, load_tasks_from_csv,
    save_project_to_csv, save_project_to_json, save_tasks_to_csv, tasks_from_csv_str,
    tasks_to_csv_string,
};
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn converted_tasks() -> Vec<TaskRecord> {
    let primary = SheetTable::from_rows(
        "Project status",
        &["School", "Status", "Trustee Zone", "Installation Date", "Notes"],
        &[
            &["ELEMENTARY SCHOOLS", "", "", "", ""],
            &["Arch St. PS", "done", "1", "2025-02-03", "Rack, north wall"],
            &["Dunlop PS", "", "3", "", "Caretaker says \"after 4pm\""],
        ],
    );
    let issues = SheetTable::from_rows(
        "school with issues",
        &["School", "Issue", "Status"],
        &[&["Arch St. PS", "Wall mounted rack issue", "pending"]],
    );
    ScheduleNormalizer::new(ConverterConfig::default(), d(2025, 3, 10))
        .convert(&primary, Some(&issues), None)
        .unwrap()
        .into_tasks()
}

#[test]
fn converted_tasks_round_trip_through_csv() {
    let tasks = converted_tasks();
    let text = tasks_to_csv_string(&tasks).unwrap();
    assert!(text.starts_with(
        "Task,Resource,Start,Finish,Duration,Completion_pct,Trustee_Zone,Category,Notes"
    ));
    assert!(text.contains("Issue Resolution"));

    let reloaded = tasks_from_csv_str(&text).unwrap();
    assert_eq!(reloaded, tasks);
}

#[test]
fn tasks_round_trip_through_csv_file() {
    let tasks = converted_tasks();
    let tmp = NamedTempFile::new().unwrap();
    save_tasks_to_csv(&tasks, tmp.path()).unwrap();
    assert_eq!(load_tasks_from_csv(tmp.path()).unwrap(), tasks);
}

#[test]
fn project_round_trips_through_json_with_metadata() {
    let metadata = ProjectMetadata {
        project_name: "East Region".into(),
        project_description: "Phase two sites".into(),
    };
    let project = Project::with_tasks(metadata.clone(), converted_tasks()).unwrap();

    let tmp = NamedTempFile::new().unwrap();
    save_project_to_json(&project, tmp.path()).unwrap();
    let loaded = load_project_from_json(tmp.path()).unwrap();

    assert_eq!(loaded.metadata(), &metadata);
    assert_eq!(loaded.tasks().unwrap(), project.tasks().unwrap());
}

#[test]
fn project_round_trips_through_csv() {
    let project = Project::sample(d(2025, 3, 10)).unwrap();
    let tmp = NamedTempFile::new().unwrap();
    save_project_to_csv(&project, tmp.path()).unwrap();

    let loaded = load_project_from_csv(tmp.path()).unwrap();
    assert_eq!(loaded.len(), 12);
    assert_eq!(loaded.tasks().unwrap(), project.tasks().unwrap());
    assert_eq!(loaded.metadata(), &ProjectMetadata::default());
}

#[test]
fn missing_required_column_is_named() {
    let text = "Task,Resource,Finish\nSite survey,Project Manager,2025-03-02\n";
    let err = tasks_from_csv_str(text).unwrap_err();
    assert!(matches!(&err, PersistenceError::MissingColumn(column) if column == "Start"));
    assert_eq!(err.to_string(), "Missing required column: Start");
}

#[test]
fn datetime_strings_load_as_calendar_dates() {
    let text = "\
Task,Start,Finish,Duration,Category
Site survey,2025-03-01 00:00:00,2025-03-03T00:00:00,2,Planning
";
    let tasks = tasks_from_csv_str(text).unwrap();
    assert_eq!(tasks[0].start, d(2025, 3, 1));
    assert_eq!(tasks[0].finish, d(2025, 3, 3));
}

#[test]
fn optional_columns_take_defaults_in_any_order() {
    let text = "\
Category,Finish,Task,Start
Delivery,2025-03-13,Arch St. PS: Delivery,2025-03-12

Closeout,2025-03-20,Project Review,2025-03-19
";
    let tasks = tasks_from_csv_str(text).unwrap();
    assert_eq!(tasks.len(), 2);

    let delivery = &tasks[0];
    assert_eq!(delivery.category, Category::Delivery);
    assert_eq!(delivery.resource, "Delivery Team");
    assert_eq!(delivery.duration, 1);
    assert_eq!(delivery.completion_pct, 0);
    assert_eq!(delivery.zone, 0);
    assert_eq!(delivery.notes, "");
    assert_eq!(tasks[1].resource, "Project Manager");
}

#[test]
fn numeric_cells_accept_float_spelling() {
    let text = "\
Task,Start,Finish,Duration,Completion_pct,Trustee_Zone
Survey,2025-03-01,2025-03-04,3.0,50.0,2.0
";
    let task = &tasks_from_csv_str(text).unwrap()[0];
    assert_eq!(task.duration, 3);
    assert_eq!(task.completion_pct, 50);
    assert_eq!(task.zone, 2);
}

#[test]
fn invalid_cells_fail_whole_load() {
    let bad_date = "Task,Start,Finish\nSurvey,someday,2025-03-04\n";
    let err = tasks_from_csv_str(bad_date).unwrap_err();
    assert!(err.to_string().contains("Error converting date columns"));

    let bad_pct = "Task,Start,Finish,Completion_pct\nSurvey,2025-03-01,2025-03-02,140\n";
    assert!(matches!(
        tasks_from_csv_str(bad_pct),
        Err(PersistenceError::InvalidData(_))
    ));

    let bad_category = "Task,Start,Finish,Category\nSurvey,2025-03-01,2025-03-02,Testing\n";
    assert!(tasks_from_csv_str(bad_category).is_err());

    let backwards = "Task,Start,Finish\nSurvey,2025-03-05,2025-03-02\n";
    assert!(tasks_from_csv_str(backwards).is_err());
}

#[test]
fn empty_table_round_trips() {
    let text = tasks_to_csv_string(&[]).unwrap();
    assert!(tasks_from_csv_str(&text).unwrap().is_empty());
}

#[test]
fn task_names_keep_surrounding_whitespace() {
    let tasks = vec![
        TaskRecord::new(" Survey ", Category::Planning, d(2025, 3, 1), 2),
        TaskRecord::new("Arch St. PS: Delivery\t", Category::Delivery, d(2025, 3, 12), 1),
    ];
    let text = tasks_to_csv_string(&tasks).unwrap();
    let reloaded = tasks_from_csv_str(&text).unwrap();
    assert_eq!(reloaded[0].name, " Survey ");
    assert_eq!(reloaded, tasks);
}

#[test]
fn csv_zone_outside_unsigned_range_is_rejected() {
    let big = "Task,Start,Finish,Trustee_Zone\nSurvey,2025-03-01,2025-03-02,4294967295\n";
    assert_eq!(tasks_from_csv_str(big).unwrap()[0].zone, u32::MAX);

    let too_big = "Task,Start,Finish,Trustee_Zone\nSurvey,2025-03-01,2025-03-02,4294967296\n";
    assert!(matches!(
        tasks_from_csv_str(too_big),
        Err(PersistenceError::InvalidData(_))
    ));
}
