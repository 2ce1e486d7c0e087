//! End-to-end pipeline run against a fake JDK and SDK whose tools are
//! `/bin/sh` scripts producing the artifacts the real tools would.
#![cfg(unix)]

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use droidpack_android_toolchain::ToolchainLocator;
use droidpack_build_engine::{
    ApkAnalyzer, BuildConfig, BuildError, BuildRunner, KeystorePassword, Stage,
};
use droidpack_core::ErrorKind;
use zip::write::FileOptions;
use zip::ZipWriter;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.app">
    <uses-sdk android:minSdkVersion="21" android:targetSdkVersion="33" />
    <application android:label="Example">
        <activity android:name=".MainActivity">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>
    </application>
</manifest>
"#;

const AAPT2: &str = r#"#!/bin/sh
cmd="$1"; shift
out=""; java=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift 2 ;;
    --java) java="$2"; shift 2 ;;
    *) shift ;;
  esac
done
if [ "$cmd" = "compile" ]; then
  echo compiled > "$out"
  exit 0
fi
cp "@FIXTURE@/base.apk" "$out"
mkdir -p "$java/com/example/app"
echo "public final class R {}" > "$java/com/example/app/R.java"
"#;

const JAVAC: &str = r#"#!/bin/sh
while [ "$1" != "-d" ]; do shift; done
mkdir -p "$2/com/example/app"
touch "$2/com/example/app/Stub.class"
"#;

const JAR: &str = r#"#!/bin/sh
while [ "$1" != "--file" ]; do shift; done
echo jar > "$2"
"#;

const D8: &str = r#"#!/bin/sh
while [ "$1" != "--output" ]; do shift; done
printf 'dex\n035\0' > "$2/classes.dex"
"#;

const D8_FAILING: &str = r#"#!/bin/sh
echo "d8 exploded" >&2
exit 3
"#;

const ZIPALIGN: &str = r#"#!/bin/sh
cp "$3" "$4"
"#;

const APKSIGNER: &str = r#"#!/bin/sh
for last in "$@"; do :; done
while [ "$1" != "--out" ]; do shift; done
cp "$last" "$2"
"#;

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn touch(path: &Path, body: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let fixture = Self { _dir: dir, root };
        fixture.jdk();
        fixture.sdk();
        fixture.project();
        fixture
    }

    fn jdk_dir(&self) -> PathBuf {
        self.root.join("jdk")
    }

    fn sdk_dir(&self) -> PathBuf {
        self.root.join("sdk")
    }

    fn android_dir(&self) -> PathBuf {
        self.root.join("android")
    }

    fn build_tools(&self) -> PathBuf {
        self.sdk_dir().join("build-tools/33.0.2")
    }

    fn jdk(&self) {
        let bin = self.jdk_dir().join("bin");
        write_script(&bin.join("java"), "#!/bin/sh\nexit 0\n");
        write_script(&bin.join("javac"), JAVAC);
        write_script(&bin.join("jar"), JAR);
        write_script(&bin.join("keytool"), "#!/bin/sh\nexit 1\n");
    }

    fn sdk(&self) {
        let sdk = self.sdk_dir();
        fs::create_dir_all(sdk.join("licenses")).unwrap();
        write_script(&sdk.join("platform-tools/adb"), "#!/bin/sh\nexit 0\n");
        write_script(
            &sdk.join("cmdline-tools/latest/bin/sdkmanager"),
            "#!/bin/sh\nexit 1\n",
        );

        let tools = self.build_tools();
        write_script(
            &tools.join("aapt2"),
            &AAPT2.replace("@FIXTURE@", &self.root.display().to_string()),
        );
        write_script(&tools.join("d8"), D8);
        write_script(&tools.join("zipalign"), ZIPALIGN);
        write_script(&tools.join("apksigner"), APKSIGNER);
        // an older release that must not be picked
        fs::create_dir_all(sdk.join("build-tools/32.0.0")).unwrap();

        touch(&sdk.join("platforms/android-33/android.jar"), b"jar");

        let mut writer = ZipWriter::new(File::create(self.root.join("base.apk")).unwrap());
        for (name, data) in [
            ("AndroidManifest.xml", &b"binary manifest"[..]),
            ("resources.arsc", &b"resource table"[..]),
        ] {
            writer.start_file(name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    fn project(&self) {
        let main = self.android_dir().join("app/src/main");
        touch(&main.join("AndroidManifest.xml"), MANIFEST.as_bytes());
        touch(
            &main.join("java/com/example/app/MainActivity.java"),
            b"package com.example.app;\npublic class MainActivity {}\n",
        );
        touch(
            &main.join("res/values/strings.xml"),
            b"<resources><string name=\"app_name\">Example</string></resources>",
        );
        for abi in ["armeabi-v7a", "arm64-v8a", "x86", "x86_64"] {
            touch(&main.join("jniLibs").join(abi).join("libmain.so"), b"\x7fELF");
        }
        touch(&self.root.join("release.keystore"), b"jks");
    }

    fn runner(&self) -> BuildRunner {
        let config = BuildConfig::builder(self.android_dir())
            .target_dir(self.root.join("target/android"))
            .keystore(
                self.root.join("release.keystore"),
                KeystorePassword::Literal("android".into()),
            )
            .build()
            .unwrap();
        let locator = ToolchainLocator::new(Some(self.jdk_dir()), Some(self.sdk_dir()));
        BuildRunner::with_locator(config, locator)
    }
}

// Single test so no other thread forks while the scripts are being written.
#[tokio::test]
async fn test_pipeline() {
    let fixture = Fixture::new();

    let output = fixture.runner().build().await.unwrap();
    assert_eq!(output.path, fixture.root.join("target/android/app.apk"));
    assert!(output.size > 0);

    let info = ApkAnalyzer::analyze(&output.path).unwrap();
    let names: Vec<&str> = info.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "AndroidManifest.xml",
            "resources.arsc",
            "classes.dex",
            "lib/arm64-v8a/libmain.so",
            "lib/armeabi-v7a/libmain.so",
            "lib/x86/libmain.so",
            "lib/x86_64/libmain.so",
        ]
    );
    assert!(info.has_dex);
    assert_eq!(info.abis(), ["arm64-v8a", "armeabi-v7a", "x86", "x86_64"]);

    // R.java is consumed by the resources stage
    assert!(!fixture
        .root
        .join("target/android/intermediates/com/example/app/R.java")
        .exists());

    // A failing tool aborts the run and is labelled with its stage
    write_script(&fixture.build_tools().join("d8"), D8_FAILING);
    let err = fixture.runner().build().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Sources));
    assert_eq!(err.kind(), ErrorKind::ToolExecution);
    let message = err.to_string();
    assert!(message.starts_with("sources: d8 failed"), "{message}");
    assert!(message.contains("d8 exploded"), "{message}");
    match err {
        BuildError::Stage { source, .. } => assert!(matches!(*source, BuildError::Tool(_))),
        other => panic!("unexpected error {other:?}"),
    }

    // the previous output was wiped, and the failed run left its intermediates
    assert!(!fixture.root.join("target/android/app.apk").exists());
    assert!(fixture
        .root
        .join("target/android/intermediates/R.jar")
        .is_file());

    // an explicit keystore that is gone fails before anything is built
    fs::remove_file(fixture.root.join("release.keystore")).unwrap();
    let err = fixture.runner().prepare().await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Keystore));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("release.keystore"), "{err}");
}
