use super::*;

#[test]
fn normalize_adds_free_user_to_empty_input() {
    assert_eq!(normalize_roles(Vec::<String>::new()), vec!["freeUser"]);
}

#[test]
fn normalize_admin_implies_paid_user() {
    let roles = normalize_roles(["admin"]);
    assert!(roles.contains(&"admin".to_string()));
    assert!(roles.contains(&"paidUser".to_string()));
    assert!(!roles.contains(&"freeUser".to_string()));
}

#[test]
fn normalize_resolves_conflicting_premium_roles() {
    let roles = normalize_roles(["paidUser", "freeUser"]);
    assert_eq!(roles, vec!["paidUser"]);
}

#[test]
fn normalize_trims_and_dedupes() {
    let roles = normalize_roles(["  editor ", "editor", "", "paidUser"]);
    assert_eq!(roles, vec!["editor", "paidUser"]);
}

#[test]
fn normalize_is_idempotent() {
    let inputs: Vec<Vec<&str>> = vec![
        vec![],
        vec!["admin"],
        vec!["paidUser", "freeUser"],
        vec!["editor", "freeUser", "editor"],
        vec![" admin ", "freeUser"],
    ];
    for input in inputs {
        let once = normalize_roles(input.clone());
        let twice = normalize_roles(once.clone());
        assert_eq!(once, twice, "input {:?}", input);
    }
}

#[test]
fn normalize_never_produces_both_premium_roles() {
    let inputs: Vec<Vec<&str>> = vec![
        vec!["admin", "freeUser"],
        vec!["freeUser"],
        vec!["paidUser"],
        vec!["admin", "paidUser", "freeUser"],
    ];
    for input in inputs {
        let out = normalize_roles(input.clone());
        let paid = out.iter().any(|r| r == ROLE_PAID_USER);
        let free = out.iter().any(|r| r == ROLE_FREE_USER);
        assert!(paid ^ free, "input {:?} produced {:?}", input, out);
        if out.iter().any(|r| r == ROLE_ADMIN) {
            assert!(paid, "admin without paidUser in {:?}", out);
        }
    }
}

#[test]
fn roles_equal_is_order_independent() {
    assert!(roles_equal(
        &["editor".to_string(), "paidUser".to_string()],
        &["paidUser".to_string(), "editor".to_string()]
    ));
    assert!(!roles_equal(
        &["editor".to_string()],
        &["admin".to_string()]
    ));
}

#[test]
fn roles_equal_sees_through_normalization() {
    // ["admin"] normalizes to admin+paidUser, so these are the same set.
    assert!(roles_equal(
        &["admin".to_string()],
        &["admin".to_string(), "paidUser".to_string()]
    ));
}
