use crate::cmd::{open_pipeline, parse_stage};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::types::{CollaboratorRole, Priority, ProjectStatus};
use forge_core::{ForgeProject, NewProject, ProjectFilter, Stage};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Create a project at the idea stage
    Create {
        /// Project name
        name: String,
        /// Owning user id
        #[arg(long)]
        owner: String,
        /// Explicit id (default: slug of the name)
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// low, medium, high or critical
        #[arg(long, default_value = "medium")]
        priority: String,
    },

    /// List projects, oldest first
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        priority: Option<String>,
    },

    /// Show one project with per-stage state
    Show { id: String },

    /// Change status: draft, active, on_hold, archived, cancelled
    Status { id: String, status: String },

    /// Add a collaborator
    Collaborator {
        id: String,
        user: String,
        /// owner, editor, reviewer or viewer
        #[arg(long, default_value = "editor")]
        role: String,
    },

    /// Delete a project document
    Delete { id: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProjectSubcommand::Create {
            name,
            owner,
            id,
            description,
            priority,
        } => create(root, name, owner, id, description, &priority, json),
        ProjectSubcommand::List {
            status,
            stage,
            owner,
            priority,
        } => {
            let filter = ProjectFilter {
                status: status.as_deref().map(str::parse::<ProjectStatus>).transpose()?,
                stage: stage.as_deref().map(parse_stage).transpose()?,
                owner,
                priority: priority.as_deref().map(str::parse::<Priority>).transpose()?,
            };
            list(root, &filter, json)
        }
        ProjectSubcommand::Show { id } => show(root, &id, json),
        ProjectSubcommand::Status { id, status } => set_status(root, &id, &status, json),
        ProjectSubcommand::Collaborator { id, user, role } => {
            collaborator(root, &id, &user, &role, json)
        }
        ProjectSubcommand::Delete { id } => delete(root, &id, json),
    }
}

// ---------------------------------------------------------------------------
// create / list / show
// ---------------------------------------------------------------------------

fn create(
    root: &Path,
    name: String,
    owner: String,
    id: Option<String>,
    description: Option<String>,
    priority: &str,
    json: bool,
) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    let project = pipeline
        .create_project(NewProject {
            id,
            name,
            owner,
            description,
            priority: priority.parse()?,
        })
        .context("failed to create project")?;

    if json {
        print_json(&project)?;
    } else {
        println!("Created project '{}' ({}) at stage {}", project.id, project.name, project.current_stage);
    }
    Ok(())
}

fn list(root: &Path, filter: &ProjectFilter, json: bool) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    let projects = pipeline.list_projects(filter).context("failed to list projects")?;

    if json {
        let rows: Vec<_> = projects
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "name": p.name,
                    "owner": p.owner,
                    "status": p.status,
                    "priority": p.priority,
                    "current_stage": p.current_stage,
                    "progress_percentage": p.progress_percentage,
                    "overall_quality": p.quality_tracking.overall_quality,
                })
            })
            .collect();
        return print_json(&rows);
    }

    if projects.is_empty() {
        println!("No projects.");
        return Ok(());
    }
    let rows = projects
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                p.status.to_string(),
                p.current_stage.to_string(),
                format!("{:.0}%", p.progress_percentage),
                format!("{:.1}", p.quality_tracking.overall_quality),
                p.owner.clone(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "STAGE", "PROGRESS", "QUALITY", "OWNER"], rows);
    Ok(())
}

fn show(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    let project = pipeline.get_project(id)?;
    if json {
        return print_json(&project);
    }
    print_project(&project);
    Ok(())
}

fn print_project(p: &ForgeProject) {
    println!("{} ({})", p.name, p.id);
    if let Some(d) = &p.description {
        println!("  {d}");
    }
    println!("  owner:    {}", p.owner);
    println!("  status:   {}  priority: {}", p.status, p.priority);
    println!("  stage:    {}  ({:.0}% complete)", p.current_stage, p.progress_percentage);
    println!("  quality:  {:.1}", p.quality_tracking.overall_quality);

    let rows = Stage::all()
        .iter()
        .map(|s| {
            let data = p.stage(*s);
            let assessment = data.and_then(|d| d.assessment.as_ref());
            let state = match data {
                Some(d) if d.stage_completed && d.overridden => "overridden",
                Some(d) if d.stage_completed => "completed",
                Some(d) if d.has_content() => "submitted",
                _ if *s == p.current_stage => "current",
                _ => "-",
            };
            vec![
                s.to_string(),
                state.to_string(),
                assessment.map_or("-".into(), |a| format!("{:.1}", a.overall_score)),
                assessment.map_or("-".into(), |a| a.gate.to_string()),
            ]
        })
        .collect();
    println!();
    print_table(&["STAGE", "STATE", "SCORE", "GATE"], rows);

    if !p.collaborators.is_empty() {
        let people: Vec<String> = p
            .collaborators
            .iter()
            .map(|c| format!("{} ({})", c.user_id, c.role))
            .collect();
        println!("\nCollaborators: {}", people.join(", "));
    }
    let open = p.quality_tracking.open_issues().count();
    if open > 0 {
        println!("Open quality issues: {open} (see `forge quality report {}`)", p.id);
    }
}

// ---------------------------------------------------------------------------
// status / collaborator / delete
// ---------------------------------------------------------------------------

fn set_status(root: &Path, id: &str, status: &str, json: bool) -> anyhow::Result<()> {
    let status: ProjectStatus = status.parse()?;
    let (_, pipeline) = open_pipeline(root)?;
    let project = pipeline.set_status(id, status)?;
    if json {
        print_json(&serde_json::json!({"id": project.id, "status": project.status}))?;
    } else {
        println!("Project '{}' is now {}", project.id, project.status);
    }
    Ok(())
}

fn collaborator(root: &Path, id: &str, user: &str, role: &str, json: bool) -> anyhow::Result<()> {
    let role: CollaboratorRole = role.parse()?;
    let (_, pipeline) = open_pipeline(root)?;
    let project = pipeline.add_collaborator(id, user, role)?;
    if json {
        print_json(&project.collaborators)?;
    } else {
        println!("Added {user} as {role} on '{}'", project.id);
    }
    Ok(())
}

fn delete(root: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let (_, pipeline) = open_pipeline(root)?;
    pipeline.delete_project(id)?;
    if json {
        print_json(&serde_json::json!({"deleted": id}))?;
    } else {
        println!("Deleted project '{id}'");
    }
    Ok(())
}
