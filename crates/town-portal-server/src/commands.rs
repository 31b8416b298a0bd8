//! Console commands for driving the simulated world by hand.
//!
//! Each command acts on a named player, so one console can play several
//! players at once (`join Alice`, `look Alice -90`, `use Alice`, ...).

use std::collections::HashMap;

use town_portal_engine::PortalService;
use town_portal_host::{
    BlockPos, Dimension, EventResult, HostEvent, ItemStack, PlayerId, Vec3, WorldHost,
};
use town_portal_sim::SimWorld;

/// What a command can reach.
pub struct CommandContext<'a> {
    pub world: &'a SimWorld,
    pub service: &'a PortalService<SimWorld>,
    /// Arguments after the command name.
    pub args: Vec<String>,
}

/// Result returned by a command handler.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    /// Lines to print back to the console.
    pub messages: Vec<String>,
    /// If true, the server should shut down.
    pub should_stop: bool,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            messages: vec![message.into()],
            should_stop: false,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
            should_stop: false,
        }
    }

    fn lines(messages: Vec<String>) -> Self {
        Self {
            success: true,
            messages,
            should_stop: false,
        }
    }
}

pub type CommandFn = fn(&CommandContext<'_>) -> CommandResult;

pub struct CommandEntry {
    pub name: String,
    pub usage: String,
    pub handler: CommandFn,
}

pub struct CommandRegistry {
    commands: HashMap<String, CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            commands: HashMap::new(),
        };
        registry.register("join", "join <name> [dimension] [x y z]", cmd_join);
        registry.register("leave", "leave <name>", cmd_leave);
        registry.register("spawnpoint", "spawnpoint <name> <dimension> <x> <y> <z> | clear", cmd_spawnpoint);
        registry.register("look", "look <name> <yaw> [pitch]", cmd_look);
        registry.register("move", "move <name> <x> <y> <z>", cmd_move);
        registry.register("give", "give <name> <item> [amount]", cmd_give);
        registry.register("use", "use <name>", cmd_use);
        registry.register("sneak", "sneak <name> on|off", cmd_sneak);
        registry.register("creative", "creative <name> on|off", cmd_creative);
        registry.register("portal_color", "portal_color <name> <index>", cmd_portal_color);
        registry.register("leash", "leash <name> <entity>", cmd_leash);
        registry.register("ride", "ride <name> <entity>", cmd_ride);
        registry.register("setblock", "setblock <dimension> <x> <y> <z> <block>", cmd_setblock);
        registry.register("portals", "portals", cmd_portals);
        registry.register("players", "players", cmd_players);
        registry.register("stop", "stop", cmd_stop);
        registry
    }

    fn register(&mut self, name: &str, usage: &str, handler: CommandFn) {
        self.commands.insert(
            name.to_string(),
            CommandEntry {
                name: name.to_string(),
                usage: usage.to_string(),
                handler,
            },
        );
    }

    /// Parse and run one console line.
    pub fn execute_line(
        &self,
        line: &str,
        world: &SimWorld,
        service: &PortalService<SimWorld>,
    ) -> CommandResult {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return CommandResult::err("Empty command");
        };
        let ctx = CommandContext {
            world,
            service,
            args: parts.map(String::from).collect(),
        };
        if name == "help" {
            return self.help();
        }
        match self.commands.get(name) {
            Some(entry) => (entry.handler)(&ctx),
            None => CommandResult::err(format!(
                "Unknown command: {name}. Type help for a list of commands."
            )),
        }
    }

    fn help(&self) -> CommandResult {
        let mut entries: Vec<&CommandEntry> = self.commands.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        let mut lines = vec!["Available commands:".to_string()];
        lines.extend(entries.iter().map(|e| format!("  {}", e.usage)));
        CommandResult::lines(lines)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

fn player_arg(ctx: &CommandContext<'_>) -> Result<PlayerId, CommandResult> {
    let name = ctx
        .args
        .first()
        .ok_or_else(|| CommandResult::err("Missing player name"))?;
    ctx.world
        .find_player(name)
        .ok_or_else(|| CommandResult::err(format!("No player named {name}")))
}

fn number<T: std::str::FromStr>(ctx: &CommandContext<'_>, index: usize) -> Result<T, CommandResult> {
    let raw = ctx
        .args
        .get(index)
        .ok_or_else(|| CommandResult::err(format!("Missing argument {index}")))?;
    raw.parse()
        .map_err(|_| CommandResult::err(format!("Not a number: {raw}")))
}

fn vec3_at(ctx: &CommandContext<'_>, index: usize) -> Result<Vec3, CommandResult> {
    Ok(Vec3::new(
        number(ctx, index)?,
        number(ctx, index + 1)?,
        number(ctx, index + 2)?,
    ))
}

fn dimension_at(ctx: &CommandContext<'_>, index: usize) -> Result<Dimension, CommandResult> {
    let raw = ctx
        .args
        .get(index)
        .ok_or_else(|| CommandResult::err("Missing dimension"))?;
    Dimension::parse(raw).ok_or_else(|| CommandResult::err(format!("Unknown dimension: {raw}")))
}

fn toggle_at(ctx: &CommandContext<'_>, index: usize) -> Result<bool, CommandResult> {
    match ctx.args.get(index).map(String::as_str) {
        Some("on" | "true") => Ok(true),
        Some("off" | "false") => Ok(false),
        _ => Err(CommandResult::err("Expected on or off")),
    }
}

/// Run a handler body that bails out with a `CommandResult` on bad input.
fn run(body: impl FnOnce() -> Result<CommandResult, CommandResult>) -> CommandResult {
    body().unwrap_or_else(|e| e)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_join(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let name = ctx
            .args
            .first()
            .ok_or_else(|| CommandResult::err("Usage: join <name> [dimension] [x y z]"))?;
        if ctx.world.find_player(name).is_some() {
            return Err(CommandResult::err(format!("{name} is already online")));
        }
        let dimension = if ctx.args.len() > 1 {
            dimension_at(ctx, 1)?
        } else {
            Dimension::Overworld
        };
        let position = if ctx.args.len() > 2 {
            vec3_at(ctx, 2)?
        } else {
            let ground = ctx.world.surface_height(dimension, 0, 0);
            Vec3::new(0.5, ground as f32, 0.5)
        };
        let id = ctx.world.join_player(name, dimension, position);
        ctx.service.handle_event(HostEvent::PlayerSpawn {
            player: id,
            initial: true,
        });
        Ok(CommandResult::ok(format!(
            "{name} joined as {id} at {position} in {dimension}"
        )))
    })
}

fn cmd_leave(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        ctx.world.leave_player(id);
        ctx.service
            .handle_event(HostEvent::PlayerLeave { player: id });
        Ok(CommandResult::ok(format!("{} left", ctx.args[0])))
    })
}

fn cmd_spawnpoint(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        if ctx.args.get(1).map(String::as_str) == Some("clear") {
            ctx.world.set_spawn_point(id, None);
            return Ok(CommandResult::ok("Spawn point cleared"));
        }
        let dimension = dimension_at(ctx, 1)?;
        let pos = BlockPos::new(number(ctx, 2)?, number(ctx, 3)?, number(ctx, 4)?);
        ctx.world.set_spawn_point(id, Some((dimension, pos)));
        Ok(CommandResult::ok(format!("Spawn point set to {pos} in {dimension}")))
    })
}

fn cmd_look(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let yaw: f32 = number(ctx, 1)?;
        let pitch: f32 = if ctx.args.len() > 2 { number(ctx, 2)? } else { 0.0 };
        ctx.world.set_look(id, yaw, pitch);
        Ok(CommandResult::ok(format!("Looking at yaw {yaw}, pitch {pitch}")))
    })
}

fn cmd_move(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let position = vec3_at(ctx, 1)?;
        ctx.world.move_player(id, position);
        Ok(CommandResult::ok(format!("Moved to {position}")))
    })
}

fn cmd_give(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let item = ctx
            .args
            .get(1)
            .ok_or_else(|| CommandResult::err("Usage: give <name> <item> [amount]"))?;
        let amount: u32 = if ctx.args.len() > 2 { number(ctx, 2)? } else { 1 };
        ctx.world.give_item(id, ItemStack::new(item.clone(), amount));
        Ok(CommandResult::ok(format!("Gave {amount} x {item}")))
    })
}

fn cmd_use(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let item = ctx
            .world
            .held_item(id)
            .ok_or_else(|| CommandResult::err("Nothing in hand"))?;
        let name = item.type_id.clone();
        match ctx
            .service
            .handle_event(HostEvent::ItemUse { player: id, item })
        {
            EventResult::Continue => Ok(CommandResult::ok(format!("Used {name}"))),
            EventResult::Cancelled => Ok(CommandResult::ok(format!("Use of {name} cancelled"))),
        }
    })
}

fn cmd_sneak(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let on = toggle_at(ctx, 1)?;
        ctx.world.set_sneaking(id, on);
        Ok(CommandResult::ok(format!("Sneaking: {on}")))
    })
}

fn cmd_creative(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let on = toggle_at(ctx, 1)?;
        ctx.world.set_creative(id, on);
        Ok(CommandResult::ok(format!("Creative: {on}")))
    })
}

fn cmd_portal_color(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        ctx.service.handle_event(HostEvent::Command {
            player: id,
            name: "portal_color".into(),
            args: ctx.args[1..].to_vec(),
        });
        Ok(CommandResult::ok("Colour request sent"))
    })
}

fn cmd_leash(ctx: &CommandContext<'_>) -> CommandResult {
    spawn_companion(ctx, |world, entity, player| world.leash_to(entity, player))
}

fn cmd_ride(ctx: &CommandContext<'_>) -> CommandResult {
    spawn_companion(ctx, |world, entity, player| world.add_rider(entity, player))
}

/// Spawn an entity at the player and attach it with `attach`.
fn spawn_companion(
    ctx: &CommandContext<'_>,
    attach: fn(&SimWorld, PlayerId, PlayerId) -> Result<(), town_portal_host::HostError>,
) -> CommandResult {
    run(|| {
        let id = player_arg(ctx)?;
        let type_id = ctx
            .args
            .get(1)
            .map(|t| {
                if t.contains(':') {
                    t.clone()
                } else {
                    format!("minecraft:{t}")
                }
            })
            .ok_or_else(|| CommandResult::err("Missing entity type"))?;
        let player = ctx
            .world
            .player(id)
            .ok_or_else(|| CommandResult::err("Player is offline"))?;
        let entity = ctx
            .world
            .spawn_entity(&type_id, player.dimension, player.position);
        attach(ctx.world, entity, id).map_err(|e| CommandResult::err(e.to_string()))?;
        Ok(CommandResult::ok(format!("Spawned {type_id} as {entity}")))
    })
}

fn cmd_setblock(ctx: &CommandContext<'_>) -> CommandResult {
    run(|| {
        let dimension = dimension_at(ctx, 0)?;
        let pos = BlockPos::new(number(ctx, 1)?, number(ctx, 2)?, number(ctx, 3)?);
        let block = ctx
            .args
            .get(4)
            .ok_or_else(|| CommandResult::err("Missing block type"))?;
        ctx.world.set_block(dimension, pos, block);
        Ok(CommandResult::ok(format!("Set {pos} in {dimension} to {block}")))
    })
}

fn cmd_portals(ctx: &CommandContext<'_>) -> CommandResult {
    let portals = ctx.service.portals();
    if portals.is_empty() {
        return CommandResult::ok("No open portals");
    }
    let lines = portals
        .iter()
        .map(|p| {
            format!(
                "{} {:?} owner {} at {} in {}{}",
                p.id,
                p.role,
                p.owner,
                p.position,
                p.dimension,
                if p.resolved { "" } else { " (unresolved)" }
            )
        })
        .collect();
    CommandResult::lines(lines)
}

fn cmd_players(ctx: &CommandContext<'_>) -> CommandResult {
    let ids = ctx.world.player_ids();
    let count = ids.len();
    let names: Vec<String> = ids
        .into_iter()
        .filter_map(|id| ctx.world.player(id))
        .map(|p| format!("{} ({}, {})", p.name, p.position, p.dimension))
        .collect();
    let list = if names.is_empty() {
        String::new()
    } else {
        format!(": {}", names.join(", "))
    };
    CommandResult::ok(format!(
        "There {verb} {count} player{s} online{list}",
        verb = if count == 1 { "is" } else { "are" },
        s = if count == 1 { "" } else { "s" },
    ))
}

fn cmd_stop(_ctx: &CommandContext<'_>) -> CommandResult {
    CommandResult {
        success: true,
        messages: vec!["Stopping the server...".to_string()],
        should_stop: true,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use town_portal_engine::PortalConfig;
    use town_portal_sim::SimSettings;

    use super::*;

    fn setup() -> (Rc<SimWorld>, PortalService<SimWorld>, CommandRegistry) {
        let world = Rc::new(SimWorld::new(SimSettings::default()));
        let service = PortalService::new(Rc::clone(&world), PortalConfig::default());
        (world, service, CommandRegistry::new())
    }

    #[test]
    fn unknown_command() {
        let (world, service, reg) = setup();
        let result = reg.execute_line("fly Alice", &world, &service);
        assert!(!result.success);
        assert!(result.messages[0].contains("Unknown command: fly"));
    }

    #[test]
    fn help_lists_every_command() {
        let (world, service, reg) = setup();
        let result = reg.execute_line("help", &world, &service);
        assert!(result.success);
        assert_eq!(result.messages.len(), 17);
        assert!(result.messages.iter().any(|l| l.contains("portal_color <name> <index>")));
    }

    #[test]
    fn join_places_player_on_surface() {
        let (world, service, reg) = setup();
        let result = reg.execute_line("join Alice", &world, &service);
        assert!(result.success);
        let id = world.find_player("alice").unwrap();
        let state = world.player(id).unwrap();
        assert_eq!(state.position, Vec3::new(0.5, 64.0, 0.5));
        // Joining marks the player as just-teleported.
        assert!(service.is_teleported(id));
        assert!(!reg.execute_line("join Alice", &world, &service).success);
    }

    #[test]
    fn player_commands_update_world() {
        let (world, service, reg) = setup();
        reg.execute_line("join Bob nether 4 40 4", &world, &service);
        let id = world.find_player("Bob").unwrap();
        assert!(reg.execute_line("spawnpoint Bob overworld 10 64 10", &world, &service).success);
        assert_eq!(
            world.player(id).unwrap().spawn_point,
            Some((Dimension::Overworld, BlockPos::new(10, 64, 10)))
        );
        assert!(reg.execute_line("move Bob 1 2 3", &world, &service).success);
        assert_eq!(world.player(id).unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert!(reg.execute_line("sneak Bob on", &world, &service).success);
        assert!(world.player(id).unwrap().sneaking);
        assert!(!reg.execute_line("sneak Bob maybe", &world, &service).success);
        assert!(reg.execute_line("give Bob town_portal:town_scroll 5", &world, &service).success);
        assert_eq!(
            world.held_item(id),
            Some(ItemStack::new("town_portal:town_scroll", 5))
        );
        assert!(!reg.execute_line("move Bob 1 two 3", &world, &service).success);
        assert!(!reg.execute_line("move Nobody 1 2 3", &world, &service).success);
    }

    #[test]
    fn leash_spawns_attached_entity() {
        let (world, service, reg) = setup();
        reg.execute_line("join Cara", &world, &service);
        let id = world.find_player("Cara").unwrap();
        assert!(reg.execute_line("leash Cara wolf", &world, &service).success);
        assert!(reg.execute_line("ride Cara horse", &world, &service).success);
        let entities = world.entities();
        assert_eq!(entities.len(), 2);
        let wolf = entities.iter().find(|e| e.type_id == "minecraft:wolf").unwrap();
        assert_eq!(wolf.leash_holder, Some(id));
        let horse = entities.iter().find(|e| e.type_id == "minecraft:horse").unwrap();
        assert_eq!(horse.riders[0].id, id);
    }

    #[test]
    fn use_without_item_fails() {
        let (world, service, reg) = setup();
        reg.execute_line("join Dan", &world, &service);
        assert!(!reg.execute_line("use Dan", &world, &service).success);
        reg.execute_line("give Dan town_portal:town_scroll", &world, &service);
        assert!(reg.execute_line("use Dan", &world, &service).success);
    }

    #[test]
    fn stop_requests_shutdown() {
        let (world, service, reg) = setup();
        assert!(reg.execute_line("stop", &world, &service).should_stop);
        assert!(reg.execute_line("portals", &world, &service).messages[0] == "No open portals");
    }
}
