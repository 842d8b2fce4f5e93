//! 设备间离线迁移集成测试
//!
//! 模拟学生设备导出 → 信封字符串（剪贴板 / 二维码内容）→
//! 教师设备导入的完整链路。

use std::sync::Arc;

use stemquest_core::{decode, encode, ProgressRecord, ProgressService, Storage, TransferError};

fn record(student: &str, game: &str, subject: &str, score: i32, date: &str) -> ProgressRecord {
    ProgressRecord {
        id: None,
        student_id: student.to_string(),
        game_id: game.to_string(),
        score,
        time_spent: 30,
        level: 2,
        grade: 9,
        subject: subject.to_string(),
        date: date.to_string(),
    }
}

fn in_memory_service() -> ProgressService {
    let storage = Storage::in_memory().expect("Failed to create in-memory storage");
    ProgressService::new(Arc::new(storage))
}

#[test]
fn test_cross_device_transfer() {
    // 设备 A：学生本机，攒了 3 条记录
    let device_a = in_memory_service();
    device_a
        .save_progress(record(
            "S1",
            "math_9th_formula_builder",
            "Math",
            100,
            "2024-01-01T00:00:00Z",
        ))
        .unwrap();
    device_a
        .save_progress(record(
            "S1",
            "math_9th_maze",
            "Math",
            60,
            "2024-01-02T00:00:00Z",
        ))
        .unwrap();
    device_a
        .save_progress(record(
            "S1",
            "physics_9th_motion",
            "Physics",
            80,
            "2024-01-03T00:00:00Z",
        ))
        .unwrap();

    let exported = device_a.export_student("S1").unwrap();
    let payload = encode(&exported).unwrap();

    // 设备 B：教师端，空库导入
    let device_b = in_memory_service();
    let records = decode(&payload).unwrap();
    let imported = device_b.import_records(records).unwrap();
    assert_eq!(imported, 3);

    let math = device_b.subject_history("Math", Some("S1"), None).unwrap();
    assert_eq!(math.len(), 2);
    assert_eq!(math[0].game_id, "math_9th_maze");
    assert_eq!(math[1].game_id, "math_9th_formula_builder");

    let physics = device_b.subject_history("Physics", None, None).unwrap();
    assert_eq!(physics.len(), 1);
    assert_eq!(physics[0].score, 80);

    // 同一个信封再导一次：幂等，不翻倍
    let again = decode(&payload).unwrap();
    device_b.import_records(again).unwrap();
    assert_eq!(
        device_b.subject_history("Math", None, None).unwrap().len(),
        2
    );
}

#[test]
fn test_tampered_payload_is_rejected_wholesale() {
    let device_a = in_memory_service();
    device_a
        .save_progress(record(
            "S1",
            "math_9th_maze",
            "Math",
            50,
            "2024-01-01T00:00:00Z",
        ))
        .unwrap();

    let payload = encode(&device_a.export_student("S1").unwrap()).unwrap();

    // 截断的载荷在解码阶段就失败
    let truncated = &payload[..payload.len() / 2];
    assert!(matches!(decode(truncated), Err(TransferError::Parse(_))));

    // 别的应用的 JSON 不是进度数据
    assert!(matches!(
        decode(r#"{"type":"homework_list","version":1,"data":[]}"#),
        Err(TransferError::Format(_))
    ));
}

#[test]
fn test_file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("stemquest.db");

    {
        let storage = Storage::new(&db_path).expect("Failed to open database");
        let service = ProgressService::new(Arc::new(storage));
        service
            .save_progress(record(
                "S1",
                "chemistry_10th_elements",
                "Chemistry",
                70,
                "2024-01-01T00:00:00Z",
            ))
            .unwrap();
    }

    // 重新打开：迁移幂等，数据仍在
    let storage = Storage::new(&db_path).expect("Failed to reopen database");
    let service = ProgressService::new(Arc::new(storage));

    let history = service.subject_history("Chemistry", None, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, 70);
}
