//! 服务层集成测试（需要数据库）

use hr_admin::{
    auth::{Actor, Role},
    error::AppError,
    models::{
        department::{DepartmentFields, UpdateDepartmentRequest},
        employee::{EmployeeFields, UpdateEmployeeRequest},
        job_title::JobTitleFields,
        user::{LoginRequest, UpdateProfileRequest},
    },
};
use rust_decimal::Decimal;
use serial_test::serial;
use uuid::Uuid;

mod common;
use common::{
    cleanup_test_db, create_test_app_state, create_test_config, create_test_user,
    department_count, seeded_department_and_job_title, setup_test_db,
};

fn admin() -> Actor {
    Actor {
        user_id: Uuid::new_v4(),
        email: "admin@company.com".to_string(),
        roles: vec![Role::Admin],
    }
}

fn fields(email: &str, department_id: Uuid, job_title_id: Uuid) -> EmployeeFields {
    EmployeeFields {
        first_name: "Jane".to_string(),
        last_name: "Smith".to_string(),
        email: email.to_string(),
        phone: None,
        department_id,
        job_title_id,
        salary: Decimal::new(7_500_000, 2),
        hire_date: chrono::NaiveDate::from_ymd_opt(2023, 1, 15).unwrap(),
    }
}

async fn audit_count(pool: &sqlx::PgPool, action: &str) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs WHERE action = $1")
        .bind(action)
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_create_employee_writes_audit_and_rejects_duplicate_email() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let (dept, job) = seeded_department_and_job_title(&pool).await;
    let actor = admin();

    let employee = state
        .employee_service
        .create(&actor, fields("jane@company.com", dept, job))
        .await
        .unwrap();
    assert!(employee.is_active);
    assert_eq!(employee.version, 1);
    assert_eq!(audit_count(&pool, "Created employee: Jane Smith").await, 1);

    let result = state
        .employee_service
        .create(&actor, fields("JANE@company.com", dept, job))
        .await;
    match result {
        Err(AppError::DuplicateKey { field, .. }) => assert_eq!(field, "email"),
        other => panic!("expected duplicate email, got {:?}", other),
    }
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_stale_employee_update_is_rejected() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let (dept, job) = seeded_department_and_job_title(&pool).await;
    let actor = admin();

    let employee = state
        .employee_service
        .create(&actor, fields("stale@company.com", dept, job))
        .await
        .unwrap();

    let mut update = UpdateEmployeeRequest {
        fields: fields("stale@company.com", dept, job),
        is_active: true,
        version: employee.version,
    };
    update.fields.salary = Decimal::new(8_000_000, 2);
    let updated = state
        .employee_service
        .update(&actor, employee.id, update.clone())
        .await
        .unwrap();
    assert_eq!(updated.version, employee.version + 1);

    // 仍使用旧版本号
    match state.employee_service.update(&actor, employee.id, update).await {
        Err(AppError::ConcurrencyConflict) => {}
        other => panic!("expected concurrency conflict, got {:?}", other),
    }

    let missing = UpdateEmployeeRequest {
        fields: fields("ghost@company.com", dept, job),
        is_active: true,
        version: 1,
    };
    assert!(matches!(
        state.employee_service.update(&actor, Uuid::new_v4(), missing).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_department_with_employees_cannot_be_deleted() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let (_, job) = seeded_department_and_job_title(&pool).await;
    let actor = admin();

    let department = state
        .department_service
        .create(
            &actor,
            DepartmentFields {
                name: "Quality Assurance".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    let employee = state
        .employee_service
        .create(&actor, fields("qa@company.com", department.id, job))
        .await
        .unwrap();
    // 停用的员工同样阻止删除
    state.employee_service.deactivate(&actor, employee.id).await.unwrap();

    match state.department_service.delete(&actor, department.id).await {
        Err(AppError::ReferentialBlock(message)) => {
            assert!(message.contains("Quality Assurance"))
        }
        other => panic!("expected referential block, got {:?}", other),
    }

    let renamed = state
        .department_service
        .update(
            &actor,
            department.id,
            UpdateDepartmentRequest {
                fields: DepartmentFields {
                    name: "QA".to_string(),
                    description: Some("Testing".to_string()),
                },
                version: department.version,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "QA");
    assert_eq!(audit_count(&pool, "Updated department: QA").await, 1);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_purge_keeps_recent_entries_and_logs_itself() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());

    sqlx::query(
        "INSERT INTO audit_logs (action, actor, occurred_at) VALUES \
         ('Created employee: Old Entry', 'admin@company.com', NOW() - INTERVAL '200 days'), \
         ('Created employee: New Entry', 'admin@company.com', NOW())",
    )
    .execute(&pool)
    .await
    .unwrap();

    let result = state.audit_service.purge(&admin()).await.unwrap();
    assert_eq!(result.deleted, 1);
    assert_eq!(audit_count(&pool, "Created employee: New Entry").await, 1);
    assert_eq!(audit_count(&pool, "Created employee: Old Entry").await, 0);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_link_employee_moves_existing_link() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let (dept, job) = seeded_department_and_job_title(&pool).await;
    let actor = admin();

    let user_id =
        create_test_user(&state, "staff@company.com", "Staff@123", Role::Employee).await;
    let first = state
        .employee_service
        .create(&actor, fields("first@company.com", dept, job))
        .await
        .unwrap();
    let second = state
        .employee_service
        .create(&actor, fields("second@company.com", dept, job))
        .await
        .unwrap();

    state.account_service.link_employee(&actor, user_id, first.id).await.unwrap();
    state.account_service.link_employee(&actor, user_id, second.id).await.unwrap();

    let (linked,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employees WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(linked, 1);

    state.account_service.unlink_employee(&actor, user_id).await.unwrap();
    let (linked,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM employees WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(linked, 0);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_cleanup_restores_seeded_departments() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    assert_eq!(department_count(&pool).await, 5);

    state
        .department_service
        .create(
            &admin(),
            DepartmentFields {
                name: "Quality Assurance".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(department_count(&pool).await, 6);

    cleanup_test_db(&pool).await;
    assert_eq!(department_count(&pool).await, 5);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_deactivate_keeps_employee_row() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let (dept, job) = seeded_department_and_job_title(&pool).await;
    let actor = admin();

    let employee = state
        .employee_service
        .create(&actor, fields("leaver@company.com", dept, job))
        .await
        .unwrap();
    let deactivated = state.employee_service.deactivate(&actor, employee.id).await.unwrap();
    assert!(!deactivated.is_active);
    assert_eq!(deactivated.version, employee.version + 1);

    let (is_active,): (bool,) = sqlx::query_as("SELECT is_active FROM employees WHERE id = $1")
        .bind(employee.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!is_active);

    let detail = state.employee_service.get(employee.id).await.unwrap();
    assert_eq!(detail.employee.email, "leaver@company.com");
    assert!(!detail.employee.is_active);
    assert_eq!(audit_count(&pool, "Deactivated employee: Jane Smith").await, 1);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_job_title_with_employees_cannot_be_deleted() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let (dept, _) = seeded_department_and_job_title(&pool).await;
    let actor = admin();

    let job_title = state
        .job_title_service
        .create(
            &actor,
            JobTitleFields {
                title: "QA Engineer".to_string(),
                description: None,
                min_salary: None,
                max_salary: None,
            },
        )
        .await
        .unwrap();
    let employee = state
        .employee_service
        .create(&actor, fields("tester@company.com", dept, job_title.id))
        .await
        .unwrap();
    state.employee_service.deactivate(&actor, employee.id).await.unwrap();

    match state.job_title_service.delete(&actor, job_title.id).await {
        Err(AppError::ReferentialBlock(message)) => assert!(message.contains("QA Engineer")),
        other => panic!("expected referential block, got {:?}", other),
    }
    assert_eq!(audit_count(&pool, "Deleted job title: QA Engineer").await, 0);

    let unused = state
        .job_title_service
        .create(
            &actor,
            JobTitleFields {
                title: "Intern".to_string(),
                description: None,
                min_salary: None,
                max_salary: None,
            },
        )
        .await
        .unwrap();
    state.job_title_service.delete(&actor, unused.id).await.unwrap();
    assert_eq!(audit_count(&pool, "Deleted job title: Intern").await, 1);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_unlock_resets_failed_login_count_but_keeps_history() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let email = "locked@company.com";
    let user_id = create_test_user(&state, email, "Staff@123", Role::Employee).await;

    let wrong = || LoginRequest {
        email: email.to_string(),
        password: "Wrong@123".to_string(),
    };
    for _ in 0..2 {
        assert!(matches!(
            state.auth_service.login(wrong()).await,
            Err(AppError::Unauthorized)
        ));
    }
    assert_eq!(state.audit_service.failed_logins_since_reset(email).await.unwrap(), 2);

    state.account_service.unlock(&admin(), user_id).await.unwrap();
    assert_eq!(state.audit_service.failed_logins_since_reset(email).await.unwrap(), 0);
    assert_eq!(audit_count(&pool, "Login Failed Reset").await, 1);

    assert!(state.auth_service.login(wrong()).await.is_err());
    assert_eq!(state.audit_service.failed_logins_since_reset(email).await.unwrap(), 1);

    let stats = state.audit_service.login_stats(email).await.unwrap();
    assert_eq!(stats.failed_since_reset, 1);
    assert_eq!(stats.total_successful, 0);
    assert!(stats.last_failed.is_some());

    // 清零标记不删除历史记录
    assert_eq!(audit_count(&pool, "Login Failed").await, 3);
}

#[tokio::test]
#[serial]
#[ignore] // 需要数据库
async fn test_email_change_reissues_access_token() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let state = create_test_app_state(config, pool.clone());
    let user_id = create_test_user(&state, "old@company.com", "Staff@123", Role::Employee).await;
    let actor = Actor {
        user_id,
        email: "old@company.com".to_string(),
        roles: vec![Role::Employee],
    };

    let unchanged = state
        .account_service
        .update_profile(
            &actor,
            UpdateProfileRequest {
                email: "OLD@company.com".to_string(),
                phone: Some("555-0100".to_string()),
            },
        )
        .await
        .unwrap();
    assert!(unchanged.access_token.is_none());

    let changed = state
        .account_service
        .update_profile(
            &actor,
            UpdateProfileRequest {
                email: "new@company.com".to_string(),
                phone: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(changed.profile.email, "new@company.com");
    assert!(!changed.profile.email_confirmed);

    let token = changed.access_token.expect("token reissued after email change");
    let claims = state.jwt_service.validate_access_token(&token.access_token).unwrap();
    assert_eq!(claims.email, "new@company.com");
    assert_eq!(claims.sub, user_id.to_string());
    assert_eq!(claims.roles, vec!["Employee".to_string()]);
}
