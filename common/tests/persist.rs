use pxg_common::{
    BoardConfig, CanvasError, CanvasStore, ConfigError, Palette, PersistError, Placement,
    Storage,
    persist::{load_grid, load_log, save_grid, save_log},
    replay,
};

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "pxg_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn config() -> BoardConfig {
    let palette = Palette::parse_list("ffffff,000000,ff4500").unwrap();
    BoardConfig::new(5, 4, 2, palette).unwrap()
}

#[test]
fn missing_files_bootstrap_defaults() {
    let tmp = temp_dir("persist_missing");

    let grid = load_grid(&tmp.join("board.dat"), 20, 2).unwrap();
    assert_eq!(grid, vec![2; 20]);

    let log = load_log(&tmp.join("data.json")).unwrap();
    assert!(log.is_empty());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn grid_survives_save_and_load() {
    let tmp = temp_dir("persist_grid");
    let path = tmp.join("board.dat");

    let grid: Vec<u8> = (0..20).map(|idx| (idx % 3) as u8).collect();
    save_grid(&path, &grid).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), grid);
    assert_eq!(load_grid(&path, 20, 0).unwrap(), grid);
    assert!(!tmp.join("board.dat.tmp").exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn grid_size_mismatch_is_fatal() {
    let tmp = temp_dir("persist_mismatch");
    let path = tmp.join("board.dat");

    std::fs::write(&path, vec![0u8; 19]).unwrap();
    let err = load_grid(&path, 20, 0).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::SizeMismatch {
            actual: 19,
            expected: 20
        }
    ));

    std::fs::write(&path, vec![0u8; 21]).unwrap();
    assert!(matches!(
        load_grid(&path, 20, 0).unwrap_err(),
        ConfigError::SizeMismatch { actual: 21, .. }
    ));

    std::fs::write(&path, Vec::<u8>::new()).unwrap();
    assert!(matches!(
        load_grid(&path, 20, 0).unwrap_err(),
        ConfigError::SizeMismatch { actual: 0, .. }
    ));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn log_survives_save_and_load_in_order() {
    let tmp = temp_dir("persist_log");
    let path = tmp.join("data.json");

    let log = vec![
        Placement { x: 4, y: 0, color: 1, time: 1_700_000_000_123 },
        Placement { x: 0, y: 3, color: 2, time: 1_700_000_000_100 },
        Placement { x: 4, y: 0, color: 0, time: 1_700_000_000_100 },
    ];
    save_log(&path, &log).unwrap();

    assert_eq!(load_log(&path).unwrap(), log);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn log_file_format_is_a_plain_json_array() {
    let tmp = temp_dir("persist_log_format");
    let path = tmp.join("data.json");

    save_log(&path, &[Placement { x: 1, y: 2, color: 3, time: 4 }]).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        r#"[{"x":1,"y":2,"color":3,"time":4}]"#
    );

    save_log(&path, &[]).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn null_log_is_empty() {
    let tmp = temp_dir("persist_null_log");
    let path = tmp.join("data.json");

    std::fs::write(&path, "null").unwrap();
    assert!(load_log(&path).unwrap().is_empty());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn malformed_log_is_fatal() {
    let tmp = temp_dir("persist_malformed");
    let path = tmp.join("data.json");

    for content in [
        "",
        "[{\"x\":1,\"y\":2,\"color\":3}]",
        "[{\"x\":-1,\"y\":2,\"color\":3,\"time\":0}]",
        "[{\"x\":1,\"y\":2,\"color\":300,\"time\":0}]",
        "{\"x\":1}",
        "[{\"x\":1,\"y\":2,\"color\":3,\"time\":0}",
    ] {
        std::fs::write(&path, content).unwrap();
        let err = load_log(&path).unwrap_err();
        assert!(
            matches!(err, PersistError::Malformed { .. }),
            "{content:?} gave {err}"
        );
    }

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn storage_round_trips_a_whole_board() {
    let tmp = temp_dir("persist_storage");
    let storage = Storage::create(tmp.join("nested/storage")).unwrap();
    let config = config();

    let store = storage.load(&config).unwrap();
    assert_eq!(store.read_all(), vec![2; 20]);

    store.place(4, 3, 0, 10).unwrap();
    store.place(0, 0, 1, 11).unwrap();
    store.place(4, 3, 1, 9).unwrap();
    let snapshot = store.snapshot();
    storage.save(&snapshot).unwrap();

    let reloaded = storage.load(&config).unwrap();
    assert_eq!(reloaded.snapshot(), snapshot);
    assert_eq!(reloaded.find_latest(4, 3).unwrap().color, 1);
    assert_eq!(reloaded.read_cell(0, 0), Ok(1));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn storage_refuses_a_board_of_other_dimensions() {
    let tmp = temp_dir("persist_other_dimensions");
    let storage = Storage::create(&tmp).unwrap();

    let store = CanvasStore::new(&config());
    storage.save(&store.snapshot()).unwrap();

    let palette = Palette::parse_list("ffffff,000000,ff4500").unwrap();
    let wider = BoardConfig::new(6, 4, 2, palette).unwrap();
    assert!(matches!(
        storage.load(&wider).err().unwrap(),
        ConfigError::SizeMismatch {
            actual: 20,
            expected: 24
        }
    ));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn storage_refuses_a_log_outside_the_palette() {
    let tmp = temp_dir("persist_log_palette");
    let storage = Storage::create(&tmp).unwrap();

    save_log(
        storage.log_path(),
        &[Placement { x: 0, y: 0, color: 7, time: 0 }],
    )
    .unwrap();

    assert!(matches!(
        storage.load(&config()).err().unwrap(),
        ConfigError::InconsistentLog { position: 0, .. }
    ));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn failed_grid_write_is_repaired_from_the_log() {
    let tmp = temp_dir("persist_failed_grid_write");
    let storage = Storage::create(&tmp).unwrap();
    let config = config();

    let store = storage.load(&config).unwrap();
    storage.save(&store.snapshot()).unwrap();

    store.place(1, 1, 1, 100).unwrap();
    // a directory squatting on the temp name makes the grid write fail
    std::fs::create_dir(tmp.join("board.dat.tmp")).unwrap();
    assert!(storage.save(&store.snapshot()).is_err());

    let reloaded = storage.load(&config).unwrap();
    assert_eq!(reloaded.read_cell(1, 1), Ok(1));
    assert_eq!(reloaded.find_latest(1, 1).unwrap().color, 1);
    assert_eq!(reloaded.snapshot(), store.snapshot());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn grid_without_matching_log_is_rebuilt_from_the_log() {
    let tmp = temp_dir("persist_grid_drift");
    let storage = Storage::create(&tmp).unwrap();
    let config = config();

    let mut grid = vec![2u8; 20];
    grid[6] = 1;
    grid[13] = 0;
    save_grid(storage.grid_path(), &grid).unwrap();
    save_log(
        storage.log_path(),
        &[Placement { x: 3, y: 2, color: 0, time: 5 }],
    )
    .unwrap();

    let store = storage.load(&config).unwrap();
    assert_eq!(store.read_cell(1, 1), Ok(2));
    assert_eq!(
        store.find_latest(1, 1),
        Err(CanvasError::NotFound { x: 1, y: 1 })
    );
    assert_eq!(store.read_cell(3, 2), Ok(0));

    let snapshot = store.snapshot();
    assert_eq!(replay(&config, &snapshot.log).unwrap(), snapshot.grid);

    std::fs::remove_dir_all(&tmp).ok();
}
