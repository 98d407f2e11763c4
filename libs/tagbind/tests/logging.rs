use std::io;
use std::sync::{Arc, Mutex};

use tagbind::{Decode, Decoder};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[derive(Decode, Default)]
struct Credentials {
    #[bind(env = "USER")]
    user: String,
    #[bind(env = "PASSWORD,secret")]
    password: String,
}

#[test]
fn secret_values_stay_out_of_logs() {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let mut creds = Credentials::default();
    tracing::subscriber::with_default(subscriber, || {
        Decoder::new("env")
            .decode(&[("USER", "admin"), ("PASSWORD", "hunter2")], &mut creds)
            .unwrap();
    });

    assert_eq!(creds.password, "hunter2");

    let logs = capture.contents();
    assert!(logs.contains("compiled decode plan"), "{logs}");
    assert!(logs.contains("admin"), "{logs}");
    assert!(logs.contains("PASSWORD"), "{logs}");
    assert!(!logs.contains("hunter2"), "{logs}");
}
