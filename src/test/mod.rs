mod model_spec;
mod realtime;
mod sim_time;
mod state_stack;
mod util;
