// profesoria command line
use anyhow::{anyhow, bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use profesoria_lib::classroom_export;
use profesoria_lib::config::AppConfig;
use profesoria_lib::course::{CourseFormat, CourseLevel, StudentSubmission, UserPreferences};
use profesoria_lib::course_generation::{CourseGenerator, GenerationSettings, UnitBuild, DEFAULT_UNIT_LEVEL};
use profesoria_lib::gemini_adapter::{GeminiClient, GenerativeModel, ImagePart};
use profesoria_lib::library::{Autosave, KeyValueStore, Library, Session, SqliteStore};
use profesoria_lib::submission_grading::{apply_to_submission, to_grade, GradingRequest, SubmissionGrader};
use profesoria_lib::AppError;

fn cli() -> Command {
    Command::new("profesoria")
        .about("AI course designer: syllabus skeletons, unit lessons, rubric grading and offline classrooms")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file (default: config/profesoria.toml)"),
        )
        .subcommand(
            Command::new("login")
                .about("Start a session with a teacher id")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(Command::new("logout").about("End the current session"))
        .subcommand(Command::new("whoami").about("Show the signed-in teacher"))
        .subcommand(Command::new("list").aliases(["ls"]).about("List the courses in the library"))
        .subcommand(
            Command::new("new")
                .about("Generate a course skeleton")
                .arg(Arg::new("topic").long("topic").value_name("TEXT").default_value(""))
                .arg(
                    Arg::new("level")
                        .long("level")
                        .value_parser(value_parser!(CourseLevel))
                        .default_value("Intermedio"),
                )
                .arg(Arg::new("profile").long("profile").value_name("TEXT").default_value(""))
                .arg(Arg::new("goal").long("goal").value_name("TEXT").default_value(""))
                .arg(
                    Arg::new("time")
                        .long("time")
                        .value_name("TEXT")
                        .default_value("15 semanas, 1h diaria"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_parser(value_parser!(CourseFormat))
                        .default_value("Mixto"),
                )
                .arg(
                    Arg::new("syllabus")
                        .long("syllabus")
                        .value_name("IMAGE")
                        .action(ArgAction::Append)
                        .value_parser(value_parser!(PathBuf))
                        .help("Syllabus page image (png, jpg, webp); repeatable"),
                )
                .arg(
                    Arg::new("students")
                        .long("students")
                        .value_name("FILE")
                        .value_parser(value_parser!(PathBuf))
                        .help("Roster, one `<control number> <name>` per line"),
                ),
        )
        .subcommand(
            Command::new("build-unit")
                .aliases(["build", "b"])
                .about("Generate the lessons of a unit")
                .arg(Arg::new("course").required(true))
                .arg(
                    Arg::new("unit")
                        .value_parser(value_parser!(usize))
                        .required_unless_present("all")
                        .help("1-based unit number"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Build every unit that has no lessons yet"),
                )
                .arg(Arg::new("level").long("level").default_value(DEFAULT_UNIT_LEVEL)),
        )
        .subcommand(
            Command::new("grade")
                .about("Grade a student submission exported from a classroom")
                .arg(Arg::new("course").required(true))
                .arg(Arg::new("submission").required(true).value_parser(value_parser!(PathBuf)))
                .arg(Arg::new("out").long("out").value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("export-html")
                .aliases(["export"])
                .about("Write the offline classroom bundle")
                .arg(Arg::new("course").required(true))
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .default_value("."),
                ),
        )
        .subcommand(
            Command::new("backup")
                .about("Export the whole library as JSON")
                .arg(Arg::new("out").long("out").value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("import")
                .about("Import a course or a library backup")
                .arg(Arg::new("file").required(true).value_parser(value_parser!(PathBuf))),
        )
        .subcommand(
            Command::new("delete")
                .aliases(["rm"])
                .about("Remove a course from the library")
                .arg(Arg::new("course").required(true)),
        )
}

struct App {
    config: AppConfig,
    store: Arc<dyn KeyValueStore>,
    session: Session,
}

impl App {
    fn open(config: AppConfig) -> anyhow::Result<Self> {
        let path = config.library_path();
        let store: Arc<dyn KeyValueStore> = Arc::new(
            SqliteStore::open(&path).with_context(|| format!("opening library at {:?}", path))?,
        );
        let session = Session::new(store.clone());
        Ok(Self {
            config,
            store,
            session,
        })
    }

    fn library(&self) -> anyhow::Result<Library> {
        let teacher = self.session.require()?;
        Ok(Library::open(self.store.clone(), &teacher)?)
    }

    fn model(&self) -> anyhow::Result<Arc<dyn GenerativeModel>> {
        Ok(Arc::new(GeminiClient::new(&self.config)?))
    }

    fn generator(&self) -> anyhow::Result<CourseGenerator> {
        Ok(CourseGenerator::new(
            self.model()?,
            GenerationSettings::from_config(&self.config),
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    profesoria_lib::init_tracing();
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            dotenvy::dotenv().ok();
            AppConfig::load(Some(path.as_path()))?
        }
        None => AppConfig::from_env_and_file()?,
    };
    let app = App::open(config)?;

    match matches.subcommand() {
        Some(("login", m)) => {
            let id = required(m, "id")?;
            let profile = app.session.login(id)?;
            let library = Library::open(app.store.clone(), &profile)?;
            println!("Sesión iniciada: {} ({} cursos)", profile.id, library.courses().len());
        }
        Some(("logout", _)) => {
            app.session.logout()?;
            println!("Sesión cerrada.");
        }
        Some(("whoami", _)) => match app.session.current()? {
            Some(profile) => println!("{} ({})", profile.id, profile.role),
            None => println!("Sin sesión activa."),
        },
        Some(("list", _)) => list_courses(&app)?,
        Some(("new", m)) => new_course(&app, m).await?,
        Some(("build-unit", m)) => build_units(&app, m).await?,
        Some(("grade", m)) => grade_submission(&app, m).await?,
        Some(("export-html", m)) => {
            let library = app.library()?;
            let course = library.resolve(required(m, "course")?)?;
            let dir = m.get_one::<PathBuf>("out").cloned().unwrap_or_else(|| PathBuf::from("."));
            let path = classroom_export::write_classroom(course, &dir)?;
            println!("Aula exportada: {}", path.display());
        }
        Some(("backup", m)) => {
            let library = app.library()?;
            let path = m
                .get_one::<PathBuf>("out")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(library.backup_file_name()));
            std::fs::write(&path, library.export()?)
                .with_context(|| format!("writing {:?}", path))?;
            println!("Respaldo de {} cursos: {}", library.courses().len(), path.display());
        }
        Some(("import", m)) => {
            let path = m
                .get_one::<PathBuf>("file")
                .ok_or_else(|| anyhow!("missing file"))?;
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
            let mut library = app.library()?;
            let ids = library.import(&text)?;
            library.save()?;
            println!("{} curso(s) importado(s).", ids.len());
        }
        Some(("delete", m)) => {
            let mut library = app.library()?;
            let id = library.resolve(required(m, "course")?)?.id.clone();
            let removed = library.delete(&id)?;
            library.save()?;
            println!("Curso eliminado: {}", removed.title);
        }
        _ => bail!("Comando no válido, usa `profesoria help`"),
    }
    Ok(())
}

fn required<'a>(m: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    m.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing argument: {}", name))
}

fn list_courses(app: &App) -> anyhow::Result<()> {
    let library = app.library()?;
    if library.courses().is_empty() {
        println!("Biblioteca vacía.");
        return Ok(());
    }
    for (i, course) in library.courses().iter().enumerate() {
        println!(
            "({}) {}  [{}]  {}/{} unidades construidas  {}",
            i + 1,
            course.title,
            course.subject_code,
            course.built_units(),
            course.units.len(),
            course.id
        );
    }
    Ok(())
}

async fn new_course(app: &App, m: &ArgMatches) -> anyhow::Result<()> {
    let mut library = app.library()?;

    let syllabus_images = m
        .get_many::<PathBuf>("syllabus")
        .into_iter()
        .flatten()
        .map(|p| read_image(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let student_list_raw = match m.get_one::<PathBuf>("students") {
        Some(path) => std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?,
        None => String::new(),
    };

    let prefs = UserPreferences {
        topic: required(m, "topic")?.to_string(),
        level: m.get_one::<CourseLevel>("level").copied().unwrap_or_default(),
        profile: required(m, "profile")?.to_string(),
        goal: required(m, "goal")?.to_string(),
        time: required(m, "time")?.to_string(),
        format: m.get_one::<CourseFormat>("format").copied().unwrap_or_default(),
        syllabus_images,
        student_list_raw,
    };

    let course = app.generator()?.generate_course_skeleton(&prefs).await?;
    if !course.is_clean() {
        info!("defaulted fields: {}", course.defaults.join(", "));
    }
    let course = course.value;
    println!("Temario generado: {} ({} unidades)", course.title, course.units.len());
    for (i, unit) in course.units.iter().enumerate() {
        println!("  {}. {}", i + 1, unit.title);
    }
    if !course.student_list.is_empty() {
        println!("PINs del grupo:");
        for student in &course.student_list {
            println!("  {}  {}  {}", student.id, student.pin, student.name);
        }
    }
    library.add(course);
    library.save()?;
    Ok(())
}

async fn build_units(app: &App, m: &ArgMatches) -> anyhow::Result<()> {
    let mut library = app.library()?;
    let index = library
        .position(required(m, "course")?)
        .ok_or_else(|| anyhow!("Curso no encontrado"))?;
    let mut course = library.courses()[index].clone();
    let level = required(m, "level")?;
    let generator = app.generator()?;

    let targets: Vec<usize> = if m.get_flag("all") {
        (0..course.units.len()).filter(|i| !course.units[*i].is_built()).collect()
    } else {
        let n = m.get_one::<usize>("unit").copied().unwrap_or(0);
        if n == 0 {
            bail!("Las unidades se numeran desde 1");
        }
        vec![n - 1]
    };

    let autosave = Autosave::spawn(app.store.clone(), library.key(), app.config.autosave_debounce());
    let outcome = async {
        for unit_index in targets {
            let build = generator.build_unit(&mut course, unit_index, level).await?;
            let title = &course.units[unit_index].title;
            match &build {
                UnitBuild::Generated(lessons) => println!("Unidad {} lista: {} lecciones", title, lessons.len()),
                UnitBuild::Placeholder(_, reason) => {
                    println!("Unidad {} sin contenido generado: {}", title, reason)
                }
            }
            library.update(course.clone())?;
            autosave.schedule(library.courses().to_vec());
        }
        Ok::<(), AppError>(())
    }
    .await;
    // units built before a failure are still written
    autosave.finish(outcome).await?;
    Ok(())
}

async fn grade_submission(app: &App, m: &ArgMatches) -> anyhow::Result<()> {
    let mut library = app.library()?;
    let mut course = library.resolve(required(m, "course")?)?.clone();
    let path = m
        .get_one::<PathBuf>("submission")
        .ok_or_else(|| anyhow!("missing submission"))?;
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    let mut submission: StudentSubmission =
        serde_json::from_str(&raw).with_context(|| format!("parsing {:?}", path))?;

    let request = GradingRequest::for_submission(&course, &submission)?;
    let grader = SubmissionGrader::new(app.model()?, app.config.grading_timeout());
    let result = grader.grade(&request).await;
    apply_to_submission(&result, &mut submission);

    println!(
        "{} / {}: {:.1} de {:.1} (autenticidad {:.0})",
        submission.student_name, request.activity_title, result.score, result.max_score, result.authenticity_score
    );
    println!("{}", result.general_feedback);

    if !result.failed {
        let lesson_id = course
            .units
            .iter()
            .flat_map(|u| u.lessons.iter())
            .find(|l| l.title == request.lesson_title)
            .map(|l| l.id.clone())
            .unwrap_or_default();
        course.record_grade(to_grade(&result, &lesson_id, chrono::Utc::now().timestamp_millis()));
        library.update(course)?;
        library.save()?;
    }

    let out = m
        .get_one::<PathBuf>("out")
        .cloned()
        .unwrap_or_else(|| graded_path(path));
    let graded = serde_json::json!({ "submission": submission, "result": result });
    std::fs::write(&out, serde_json::to_string_pretty(&graded)?)
        .with_context(|| format!("writing {:?}", out))?;
    println!("Evaluación guardada en {}", out.display());
    Ok(())
}

fn graded_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("Entrega");
    path.with_file_name(format!("{}_evaluada.json", stem))
}

fn read_image(path: &Path) -> anyhow::Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => bail!("{:?}: convierte el PDF a imágenes por página antes de cargarlo", path),
        _ => bail!("{:?}: formato de imagen no soportado", path),
    };
    let bytes = std::fs::read(path).with_context(|| format!("reading {:?}", path))?;
    let part = ImagePart::from_bytes(mime, &bytes);
    Ok(format!("data:{};base64,{}", part.mime_type, part.data))
}
