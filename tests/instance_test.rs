use app_instance::{AppEnvironment, AppInstance, Notifier, StartupSettings};
use std::sync::mpsc;

// Lock and window names are session wide on Windows, so every test gets its own
fn environment(dir: &tempfile::TempDir) -> AppEnvironment {
    let name = format!(
        "MainApp{}",
        dir.path().file_name().unwrap().to_string_lossy()
    );
    AppEnvironment::current()
        .with_application_name(name.as_str())
        .with_main_window_title(name.as_str())
        .with_session_dir(dir.path())
        .packaged(false)
}

#[test]
fn secondary_forwards_arguments_to_primary() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir);
    let (tx, rx) = mpsc::channel();

    // Instance A
    let mut a_registered = false;
    let mut a = AppInstance::acquire(&env, || a_registered = true).unwrap();
    assert!(a.is_owned());
    assert!(a_registered);
    a.listen(move |m| tx.send(m).unwrap()).unwrap();

    // Instance B
    let b_settings = StartupSettings::from_args([
        "--server",
        "localhost:5000",
        "--parent-process-id",
        "31337",
        "Sales.pbix",
    ])
    .unwrap();
    let mut b_registered = false;
    let b = AppInstance::acquire(&env, || b_registered = true).unwrap();
    assert!(!b.is_owned());
    assert!(!b_registered);
    b.notify_owner(&b_settings).unwrap();
    drop(b);

    let received = rx.try_recv().unwrap();
    assert_eq!(received.to_settings(), b_settings);

    // A terminates
    drop(a);
    assert!(Notifier::new(&env).find_window().is_none());

    // Instance C
    let c = AppInstance::new(&env).unwrap();
    assert!(c.is_owned());
}

#[test]
fn secondary_without_primary_window_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir);
    // Owner that never opened a receiving window
    let primary = AppInstance::new(&env).unwrap();
    let secondary = AppInstance::new(&env).unwrap();
    assert!(primary.is_owned());
    assert!(Notifier::new(&env).find_window().is_none());
    secondary
        .notify_owner(&StartupSettings::from_args(["lost.pbix"]).unwrap())
        .unwrap();
}

#[test]
fn packaged_and_unpackaged_variants_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let unpackaged = AppInstance::new(&environment(&dir)).unwrap();
    let packaged = AppInstance::new(&environment(&dir).packaged(true)).unwrap();
    assert!(unpackaged.is_owned());
    assert!(packaged.is_owned());
}

#[test]
fn notify_after_primary_exits_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let env = environment(&dir);
    let (tx, rx) = mpsc::channel();
    let mut primary = AppInstance::new(&env).unwrap();
    primary.listen(move |m| tx.send(m).unwrap()).unwrap();
    let secondary = AppInstance::new(&env).unwrap();

    primary.dispose();

    secondary
        .notify_owner(&StartupSettings::from_args(["late.pbix"]).unwrap())
        .unwrap();
    assert!(rx.try_recv().is_err());
}
